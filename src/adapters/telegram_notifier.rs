//! Telegram trade notifier.
//!
//! Sends a short message per executed trade and a summary at run end via
//! the Bot API `sendMessage` method. The driver treats delivery as
//! fire-and-forget; errors surface as `CryptosimError::Notify` and are
//! logged upstream, never fatal.

use crate::domain::driver::PerformanceSummary;
use crate::domain::error::CryptosimError;
use crate::domain::ledger::{PortfolioState, TradeRecord};
use crate::ports::notify_port::NotifyPort;
use reqwest::blocking::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
}

pub struct TelegramNotifier {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: String, chat_id: String) -> Result<Self, CryptosimError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CryptosimError::Notify {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            bot_token,
            chat_id,
        })
    }

    fn send(&self, text: String) -> Result<(), CryptosimError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        self.client
            .post(&url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .map_err(|e| CryptosimError::Notify {
                reason: format!("request failed: {e}"),
            })?
            .error_for_status()
            .map_err(|e| CryptosimError::Notify {
                reason: format!("server error: {e}"),
            })?;
        Ok(())
    }

    fn trade_message(record: &TradeRecord, state: &PortfolioState) -> String {
        format!(
            "{} {:.2} USD @ {:.2} ({:.6} units)\n\
             Reason: {}\n\
             Portfolio: cash {:.2} USD, holdings {:.6}, total {:.2} USD",
            record.action,
            record.traded_amount,
            record.price,
            record.traded_quantity,
            record.reason,
            state.cash,
            state.holdings,
            state.total_value,
        )
    }

    fn summary_message(summary: &PerformanceSummary) -> String {
        format!(
            "Run complete: {} -> {}\n\
             Return: {:.2}% (buy & hold {:.2}%)\n\
             Final value: {:.2} USD, realized profit {:.2} USD, {} trades",
            summary.run_period.start,
            summary.run_period.end,
            summary.total_return_percent,
            summary.buy_and_hold_return_percent,
            summary.final_value,
            summary.realized_profit,
            summary.trade_count,
        )
    }
}

impl NotifyPort for TelegramNotifier {
    fn trade_executed(
        &self,
        record: &TradeRecord,
        state: &PortfolioState,
    ) -> Result<(), CryptosimError> {
        self.send(Self::trade_message(record, state))
    }

    fn run_completed(&self, summary: &PerformanceSummary) -> Result<(), CryptosimError> {
        self.send(Self::summary_message(summary))
    }
}
