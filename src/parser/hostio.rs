//! HostIO naming and categorization.
//!
//! HostIO events represent calls from WASM to the Stylus VM runtime.
//! Tracers and EVM opcodes use several spellings for the same call;
//! everything is folded onto one canonical name so profiles compare cleanly.

use serde::{Deserialize, Serialize};

/// Type of HostIO operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostIoType {
    StorageLoad,
    StorageStore,
    StorageFlush,
    StorageCache,
    Call,
    StaticCall,
    DelegateCall,
    Create,
    Log,
    SelfDestruct,
    AccountBalance,
    BlockHash,
    // Stylus specific
    NativeKeccak256,
    ReadArgs,
    WriteResult,
    MsgValue,
    MsgSender,
    MsgReentrant,
}

impl std::str::FromStr for HostIoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "storage_load" | "storage_load_bytes32" => Self::StorageLoad,
            "storage_store" | "storage_store_bytes32" => Self::StorageStore,
            "storage_flush" | "storage_flush_cache" => Self::StorageFlush,
            "storage_cache" | "storage_cache_bytes32" => Self::StorageCache,
            "call" | "call_contract" => Self::Call,
            "staticcall" | "static_call_contract" => Self::StaticCall,
            "delegatecall" | "delegate_call_contract" => Self::DelegateCall,
            "create" | "create1" | "create2" => Self::Create,
            "emit_log" | "log" => Self::Log,
            "selfdestruct" => Self::SelfDestruct,
            "account_balance" => Self::AccountBalance,
            "block_hash" => Self::BlockHash,
            "native_keccak256" | "keccak256" => Self::NativeKeccak256,
            "read_args" => Self::ReadArgs,
            "write_result" => Self::WriteResult,
            "msg_value" => Self::MsgValue,
            "msg_sender" => Self::MsgSender,
            "msg_reentrant" => Self::MsgReentrant,
            _ => return Err(format!("unknown hostio '{}'", s)),
        })
    }
}

impl HostIoType {
    /// Try to map an EVM opcode or instruction to a HostIO type
    pub fn from_opcode(op: &str) -> Option<Self> {
        match op.to_uppercase().as_str() {
            "SLOAD" => Some(Self::StorageLoad),
            "SSTORE" => Some(Self::StorageFlush), // In Stylus, SSTORE often means flush
            "LOG0" | "LOG1" | "LOG2" | "LOG3" | "LOG4" => Some(Self::Log),
            "CALL" => Some(Self::Call),
            "STATICCALL" => Some(Self::StaticCall),
            "DELEGATECALL" => Some(Self::DelegateCall),
            "CREATE" | "CREATE2" => Some(Self::Create),
            "SELFDESTRUCT" => Some(Self::SelfDestruct),
            "BALANCE" => Some(Self::AccountBalance),
            "BLOCKHASH" => Some(Self::BlockHash),
            "KECCAK256" | "SHA3" => Some(Self::NativeKeccak256),
            "CALLDATACOPY" => Some(Self::ReadArgs),
            "RETURN" => Some(Self::WriteResult),
            "CALLVALUE" => Some(Self::MsgValue),
            "CALLER" => Some(Self::MsgSender),
            _ => None,
        }
    }

    /// Recognise any tracer name or opcode spelling
    pub fn from_label(label: &str) -> Option<Self> {
        label
            .parse::<Self>()
            .ok()
            .or_else(|| Self::from_opcode(label))
    }

    /// Canonical name used in profiles and threshold files
    pub fn name(self) -> &'static str {
        match self {
            HostIoType::StorageLoad => "storage_load",
            HostIoType::StorageStore => "storage_store",
            HostIoType::StorageFlush => "storage_flush_cache",
            HostIoType::StorageCache => "storage_cache",
            HostIoType::Call => "call",
            HostIoType::StaticCall => "staticcall",
            HostIoType::DelegateCall => "delegatecall",
            HostIoType::Create => "create",
            HostIoType::Log => "emit_log",
            HostIoType::SelfDestruct => "selfdestruct",
            HostIoType::AccountBalance => "account_balance",
            HostIoType::BlockHash => "block_hash",
            HostIoType::NativeKeccak256 => "native_keccak256",
            HostIoType::ReadArgs => "read_args",
            HostIoType::WriteResult => "write_result",
            HostIoType::MsgValue => "msg_value",
            HostIoType::MsgSender => "msg_sender",
            HostIoType::MsgReentrant => "msg_reentrant",
        }
    }

    /// Storage writes dominate Stylus costs and get flagged in summaries
    pub fn is_expensive(self) -> bool {
        matches!(self, HostIoType::StorageStore | HostIoType::StorageFlush)
    }
}
