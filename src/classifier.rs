// Category Classifier
// Ordered first-match-wins predicate chain over the lowercased message body,
// dispatching to one category parser per match. Priority order is an explicit
// data structure (CATEGORY_CHAIN), not buried control flow, because the
// categories overlap lexically: "payment" + "airtime" must win over the
// generic payment-to-code branch.

use anyhow::Result;

use crate::extract::Patterns;
use crate::model::{Category, TransactionDetails, TransactionRecord};

/// Precomputed view of one message: lowercased copy for the keyword checks,
/// plus the one pattern check (phone number) that runs against the original
/// text.
pub struct MessageView {
    lower: String,
    has_phone: bool,
}

impl MessageView {
    fn new(raw: &str, patterns: &Patterns) -> Self {
        MessageView {
            lower: raw.to_lowercase(),
            has_phone: patterns.has_phone_number(raw),
        }
    }

    fn contains(&self, needle: &str) -> bool {
        self.lower.contains(needle)
    }
}

type Predicate = fn(&MessageView) -> bool;

/// Priority-ordered (category, predicate) chain. Evaluated top to bottom,
/// first match wins; no match means the message goes to overflow.
pub const CATEGORY_CHAIN: [(Category, Predicate); 10] = [
    (Category::IncomingMoney, is_incoming_money),
    (Category::AirtimeBill, is_airtime_bill),
    (Category::CashPowerBill, is_cash_power_bill),
    (Category::PaymentToCodeHolder, is_completed_payment),
    (Category::TransferToMobile, is_transfer_to_mobile),
    (Category::BankDeposit, is_bank_deposit),
    (Category::AgentWithdrawal, is_agent_withdrawal),
    (Category::BankTransfer, is_bank_transfer),
    (Category::BundlePurchase, is_bundle_purchase),
    (Category::ThirdParty, is_third_party),
];

fn is_incoming_money(v: &MessageView) -> bool {
    v.contains("received") && v.contains("from")
}

/// Shared guard for the three payment branches.
fn is_completed_payment(v: &MessageView) -> bool {
    v.contains("payment") && (v.contains("completed") || v.contains("paid"))
}

fn is_airtime_bill(v: &MessageView) -> bool {
    is_completed_payment(v) && v.contains("airtime")
}

fn is_cash_power_bill(v: &MessageView) -> bool {
    is_completed_payment(v)
        && (v.contains("cash power") || v.contains("electricity") || v.contains("eucl"))
}

fn is_transfer_to_mobile(v: &MessageView) -> bool {
    v.contains("sent") && v.has_phone
}

fn is_bank_deposit(v: &MessageView) -> bool {
    v.contains("deposit") && v.contains("bank")
}

fn is_agent_withdrawal(v: &MessageView) -> bool {
    v.contains("withdrawn") && v.contains("agent")
}

fn is_bank_transfer(v: &MessageView) -> bool {
    v.contains("bank transfer") || v.contains("transferred to")
}

fn is_bundle_purchase(v: &MessageView) -> bool {
    v.contains("bundle") || v.contains("internet") || v.contains("voice")
}

fn is_third_party(v: &MessageView) -> bool {
    v.contains("third party")
}

/// Classifier for one batch. Owns the compiled pattern set and the overflow
/// collection of unmatched messages (appended in strict arrival order; not
/// safe for uncoordinated concurrent writers).
pub struct Classifier {
    patterns: Patterns,
    unprocessed: Vec<String>,
}

impl Classifier {
    pub fn new() -> Result<Self> {
        Ok(Classifier {
            patterns: Patterns::new()?,
            unprocessed: Vec::new(),
        })
    }

    /// Classify one message. `Ok(Some(record))` when a category matched,
    /// `Ok(None)` when the message was diverted to overflow. Deliberately not
    /// idempotent on the overflow path: the same unmatched message classified
    /// twice is appended twice.
    ///
    /// Missing optional fields never surface as errors; a captured numeric
    /// that fails to parse does.
    pub fn classify(&mut self, message: &str) -> Result<Option<TransactionRecord>> {
        let message = message.trim();

        // Common fields come from the ORIGINAL text: identifiers and
        // timestamps are case-sensitive.
        let amount = self.patterns.amount(message)?;
        let date_time = self.patterns.date_time(message);
        let transaction_id = self.patterns.transaction_id(message);

        let view = MessageView::new(message, &self.patterns);
        let category = CATEGORY_CHAIN
            .iter()
            .find(|(_, predicate)| predicate(&view))
            .map(|(category, _)| *category);

        let Some(category) = category else {
            self.unprocessed.push(message.to_string());
            return Ok(None);
        };

        let details = self.parse_details(category, message)?;

        Ok(Some(TransactionRecord {
            amount,
            date_time,
            transaction_id,
            raw_message: message.to_string(),
            details,
        }))
    }

    /// Dispatch to the category parser. Each parser is independent and
    /// stateless; none calls another.
    fn parse_details(&self, category: Category, message: &str) -> Result<TransactionDetails> {
        let p = &self.patterns;

        let details = match category {
            Category::IncomingMoney => TransactionDetails::IncomingMoney {
                sender: p.sender(message),
            },
            Category::PaymentToCodeHolder => TransactionDetails::PaymentToCodeHolder {
                recipient: p.recipient(message),
            },
            Category::TransferToMobile => TransactionDetails::TransferToMobile {
                phone_number: p.phone_number(message),
                fee: p.fee(message)?,
            },
            Category::BankDeposit => TransactionDetails::BankDeposit {
                bank_name: p.bank_name_deposit(message),
                reference: p.reference(message),
            },
            Category::AirtimeBill => TransactionDetails::AirtimeBill {
                fee: p.fee(message)?,
            },
            Category::CashPowerBill => TransactionDetails::CashPowerBill {
                meter_number: p.meter_number(message),
            },
            Category::ThirdParty => TransactionDetails::ThirdParty {
                initiator: p.initiator(message),
            },
            Category::AgentWithdrawal => {
                let agent = p.agent(message);
                let (agent_name, agent_phone) = match agent {
                    Some((name, phone)) => (Some(name), Some(phone)),
                    None => (None, None),
                };
                TransactionDetails::AgentWithdrawal {
                    agent_name,
                    agent_phone,
                }
            }
            Category::BankTransfer => TransactionDetails::BankTransfer {
                bank_name: p.bank_name_transfer(message),
                reference: p.reference(message),
            },
            Category::BundlePurchase => {
                let bundle_size = p.bundle_size(message);
                // bundle_type has no pattern of its own: it is read off the
                // matched size token (data-unit suffix => Internet).
                let bundle_type = bundle_size.as_deref().map(|size| {
                    if size.contains("GB") || size.contains("MB") {
                        "Internet".to_string()
                    } else {
                        "Voice".to_string()
                    }
                });
                TransactionDetails::BundlePurchase {
                    bundle_type,
                    bundle_size,
                    validity_period: p.validity_period(message),
                }
            }
        };

        Ok(details)
    }

    /// Overflow collection, in arrival order.
    pub fn unprocessed(&self) -> &[String] {
        &self.unprocessed
    }

    /// Consume the classifier, handing the overflow collection to the sink.
    pub fn into_unprocessed(self) -> Vec<String> {
        self.unprocessed
    }
}

// ============================================================================
// TESTS
// ============================================================================
