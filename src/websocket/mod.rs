pub mod channel;
pub mod observer;
pub mod types;

pub use self::channel::{
    ChannelDto,
    HandshakeMessage,
    MessageDto,
    ProxyHandle,
    RecordedProxy,
};

pub use self::observer::WebSocketObserver;

pub use self::types::{Direction, Opcode, Payload, ProxyState};
