pub mod command;
pub mod event;
pub mod response;
pub mod template;

pub use command::{DeviceCommand, ResponseKind};
pub use event::{BannerKind, SensorEvent};
pub use response::{CommandResponse, ResponseMatch, match_response};
pub use template::{
    AssemblerState, AssemblerStep, TemplateAssembler, TransferDialect, decode_hex, encode_hex,
    encode_transfer,
};
