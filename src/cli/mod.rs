pub mod ask_cmd;
pub mod config_cmd;
pub mod output;
pub mod record_cmd;
pub mod renderer;
pub mod report_cmd;
