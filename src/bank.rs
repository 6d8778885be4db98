//! Supported banks: labels, extraction prompts, and default split factors.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tuning extraction for one bank's layout
//!    means editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    spinning up a real vision model.
//!
//! Each bank maps to a prompt template and a default page-split factor.
//! Most statements fit a single model pass; 케이뱅크 prints very dense rows,
//! so its pages are split into 3 overlapping vertical bands by default.

use std::fmt;
use std::str::FromStr;

/// The set of banks with a dedicated prompt template.
///
/// [`Bank::Other`] is the fallback for statements from any other issuer;
/// its prompt carries no layout hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Bank {
    Kookmin,
    Shinhan,
    Woori,
    Hana,
    Nonghyup,
    KBank,
    #[default]
    Other,
}

/// All supported banks, in the order they are offered to users.
pub const ALL_BANKS: [Bank; 7] = [
    Bank::Kookmin,
    Bank::Shinhan,
    Bank::Woori,
    Bank::Hana,
    Bank::Nonghyup,
    Bank::KBank,
    Bank::Other,
];

impl Bank {
    /// Human-facing label, also used as the sheet title and export filename stem.
    pub fn label(&self) -> &'static str {
        match self {
            Bank::Kookmin => "KB국민은행",
            Bank::Shinhan => "신한은행",
            Bank::Woori => "우리은행",
            Bank::Hana => "하나은행",
            Bank::Nonghyup => "NH농협은행",
            Bank::KBank => "케이뱅크",
            Bank::Other => "기타",
        }
    }

    /// Default number of vertical bands a page is split into before
    /// submission. 1 means the page is sent whole.
    pub fn default_split_factor(&self) -> u32 {
        match self {
            Bank::KBank => 3,
            _ => 1,
        }
    }

    /// Build the extraction prompt for this bank.
    pub fn prompt(&self) -> String {
        let hint = match self {
            Bank::Kookmin => {
                "Layout: KB국민은행 statements show one transaction per row with \
                 거래일시 (date and time), 적요/내용, 출금액, 입금액, and 잔액 columns. \
                 A non-empty 입금액 cell means type \"입금\"; a non-empty 출금액 cell means \"출금\"."
            }
            Bank::Shinhan => {
                "Layout: 신한은행 statements list 거래일자, 적요, 출금, 입금, 잔액, 내용. \
                 Use the 내용 column as the reason when present, otherwise 적요."
            }
            Bank::Woori => {
                "Layout: 우리은행 statements list 거래일시, 기재내용, 지급(출금), 입금, 거래후잔액. \
                 지급 amounts are withdrawals; 입금 amounts are deposits."
            }
            Bank::Hana => {
                "Layout: 하나은행 statements list 거래일시, 적요, 의뢰인/수취인, 출금액, 입금액, 잔액. \
                 Use 의뢰인/수취인 as the reason when the 적요 cell is generic."
            }
            Bank::Nonghyup => {
                "Layout: NH농협은행 statements list 거래일시, 출금금액, 입금금액, 거래후잔액, 거래내용. \
                 Use 거래내용 as the reason."
            }
            Bank::KBank => {
                "Layout: 케이뱅크 statements pack many narrow rows per page; the image you \
                 receive may be a vertical slice of a page, and rows near its top or bottom \
                 edge may be partially cut. Extract only rows that are fully visible."
            }
            Bank::Other => "",
        };

        let mut prompt = String::from(BASE_PROMPT);
        if !hint.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(hint);
        }
        prompt
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Bank {
    type Err = String;

    /// Accepts the Korean label or an ASCII identifier (`kbank`, `kookmin`, …).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        for bank in ALL_BANKS {
            if trimmed == bank.label() {
                return Ok(bank);
            }
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "kookmin" | "kb" => Ok(Bank::Kookmin),
            "shinhan" => Ok(Bank::Shinhan),
            "woori" => Ok(Bank::Woori),
            "hana" => Ok(Bank::Hana),
            "nonghyup" | "nh" => Ok(Bank::Nonghyup),
            "kbank" => Ok(Bank::KBank),
            "other" | "etc" => Ok(Bank::Other),
            _ => Err(format!(
                "unknown bank '{}' (expected one of: {})",
                s,
                ALL_BANKS.map(|b| b.label()).join(", ")
            )),
        }
    }
}

/// Base extraction prompt shared by every bank.
///
/// The model must answer with a bare JSON array; the parser tolerates code
/// fences anyway, but asking for none keeps responses short.
const BASE_PROMPT: &str = r#"You are reading one page (or a vertical slice of a page) of a scanned Korean bank statement.

Extract EVERY transaction row that is fully visible in the image, in reading order.

For each transaction output an object with exactly these keys:
  - "date": the transaction timestamp as "YYYY-MM-DD HH:MM:SS", or "YYYY-MM-DD" if no time is printed
  - "type": "입금" for a deposit, "출금" for a withdrawal
  - "amount": the transaction amount as a plain integer, no separators, no currency symbol
  - "reason": the transaction description/counterparty text, verbatim

Rules:
  1. Output ONLY a JSON array of these objects. No commentary, no code fences.
  2. If the page contains no transaction rows, output [].
  3. Never invent rows. Skip header rows, balance summaries, and carried-over totals.
  4. Amounts are always non-negative; the "type" field carries the direction."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_bank_prompt_demands_json_array() {
        for bank in ALL_BANKS {
            let prompt = bank.prompt();
            assert!(prompt.contains("JSON array"), "{bank:?}");
            assert!(prompt.contains("\"type\""), "{bank:?}");
        }
    }

    #[test]
    fn split_factor_defaults() {
        assert_eq!(Bank::KBank.default_split_factor(), 3);
        assert_eq!(Bank::Kookmin.default_split_factor(), 1);
        assert_eq!(Bank::Other.default_split_factor(), 1);
    }

    #[test]
    fn parse_labels_and_identifiers() {
        assert_eq!("케이뱅크".parse::<Bank>().unwrap(), Bank::KBank);
        assert_eq!("kbank".parse::<Bank>().unwrap(), Bank::KBank);
        assert_eq!("KB국민은행".parse::<Bank>().unwrap(), Bank::Kookmin);
        assert_eq!("other".parse::<Bank>().unwrap(), Bank::Other);
        assert!("monzo".parse::<Bank>().is_err());
    }
}
