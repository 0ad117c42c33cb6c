pub mod broker;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod http;
pub mod registry;
pub mod source;
pub mod supervisor;

pub use broker::{BrokerSnapshot, Cancelled, FrameBroker, Subscription};
pub use config::{Args, Device, ServerConfig};
pub use encoder::Encoder;
pub use error::{EncodeError, Result, SourceError, StreamError, StreamerError};
pub use frame::{EncodedFrame, Frame};
pub use registry::{ClientRegistry, ClientSession};
pub use source::{DeviceInfo, FrameSource};
pub use supervisor::Supervisor;
