pub mod opcodes;
pub mod schemes;
