pub mod content;
pub mod export;
pub mod factory;
pub mod map;
pub mod namer;
pub mod node;
pub mod observer;

pub use content::{MessageContent, MessageRef, NodeContent};
pub use factory::{ConnectionChain, NodeFactory};
pub use map::{TreeView, WebSocketTreeMap, TREE_MAP_OBSERVING_ORDER};
pub use namer::{websocket_host_name, NodeNamer, SimpleNodeNamer, ROOT_NAME};
pub use node::{NodeId, Tree, TreeNode};
pub use observer::{ChannelNodeObserver, NodeEvent, NodeObserver, ObserverId};
