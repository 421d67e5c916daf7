// Transaction model
// One variant per message category so that "which fields are meaningful for
// this category" is a type-level invariant, plus the flat row shape the
// store and the query API speak.

use serde::{Deserialize, Serialize};

/// The mutually exclusive transaction categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    IncomingMoney,
    PaymentToCodeHolder,
    TransferToMobile,
    BankDeposit,
    AirtimeBill,
    CashPowerBill,
    ThirdParty,
    AgentWithdrawal,
    BankTransfer,
    BundlePurchase,
}

impl Category {
    /// Tag string persisted in the `transaction_type` column and exposed by
    /// the query API.
    pub fn name(&self) -> &'static str {
        match self {
            Category::IncomingMoney => "Incoming Money",
            Category::PaymentToCodeHolder => "Payment to Code Holder",
            Category::TransferToMobile => "Transfer to Mobile Number",
            Category::BankDeposit => "Bank Deposit",
            Category::AirtimeBill => "Airtime Bill Payment",
            Category::CashPowerBill => "Cash Power Bill Payment",
            Category::ThirdParty => "Third Party Transaction",
            Category::AgentWithdrawal => "Agent Withdrawal",
            Category::BankTransfer => "Bank Transfer",
            Category::BundlePurchase => "Internet/Voice Bundle Purchase",
        }
    }
}

/// Category-specific fields. Missing optional fields stay None all the way
/// into the store (NULL columns), never empty-string placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransactionDetails {
    IncomingMoney {
        sender: Option<String>,
    },
    PaymentToCodeHolder {
        recipient: Option<String>,
    },
    TransferToMobile {
        phone_number: Option<String>,
        fee: Option<f64>,
    },
    BankDeposit {
        bank_name: Option<String>,
        reference: Option<String>,
    },
    AirtimeBill {
        fee: Option<f64>,
    },
    CashPowerBill {
        meter_number: Option<String>,
    },
    ThirdParty {
        initiator: Option<String>,
    },
    AgentWithdrawal {
        agent_name: Option<String>,
        agent_phone: Option<String>,
    },
    BankTransfer {
        bank_name: Option<String>,
        reference: Option<String>,
    },
    BundlePurchase {
        bundle_type: Option<String>,
        bundle_size: Option<String>,
        validity_period: Option<String>,
    },
}

impl TransactionDetails {
    pub fn category(&self) -> Category {
        match self {
            TransactionDetails::IncomingMoney { .. } => Category::IncomingMoney,
            TransactionDetails::PaymentToCodeHolder { .. } => Category::PaymentToCodeHolder,
            TransactionDetails::TransferToMobile { .. } => Category::TransferToMobile,
            TransactionDetails::BankDeposit { .. } => Category::BankDeposit,
            TransactionDetails::AirtimeBill { .. } => Category::AirtimeBill,
            TransactionDetails::CashPowerBill { .. } => Category::CashPowerBill,
            TransactionDetails::ThirdParty { .. } => Category::ThirdParty,
            TransactionDetails::AgentWithdrawal { .. } => Category::AgentWithdrawal,
            TransactionDetails::BankTransfer { .. } => Category::BankTransfer,
            TransactionDetails::BundlePurchase { .. } => Category::BundlePurchase,
        }
    }
}

/// One classified message: the common fields plus the category variant.
/// Created exactly once by the classifier, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub amount: f64,
    pub date_time: Option<String>,
    pub transaction_id: Option<String>,
    pub raw_message: String,
    pub details: TransactionDetails,
}

impl TransactionRecord {
    pub fn category(&self) -> Category {
        self.details.category()
    }

    pub fn transaction_type(&self) -> &'static str {
        self.category().name()
    }
}

/// Flat row shape read back from the `transactions` table. This is what the
/// query API serializes; columns that never applied to the row's category
/// come back as None.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: i64,
    pub transaction_id: Option<String>,
    pub transaction_type: String,
    pub amount: f64,
    pub fee: Option<f64>,
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub phone_number: Option<String>,
    pub agent_name: Option<String>,
    pub agent_phone: Option<String>,
    pub bank_name: Option<String>,
    pub reference: Option<String>,
    pub meter_number: Option<String>,
    pub bundle_type: Option<String>,
    pub bundle_size: Option<String>,
    pub validity_period: Option<String>,
    pub date_time: Option<String>,
    pub raw_message: String,
    pub created_at: Option<String>,
}

// ============================================================================
// TESTS
// ============================================================================
