mod build;
mod config;
mod deploy;
mod destroy;
mod init;
mod run;
mod status;
mod test_values;
mod topsort;

pub use build::cmd_build;
pub use config::{cmd_config_get, cmd_config_list, cmd_config_path, cmd_config_set};
pub use deploy::cmd_deploy;
pub use destroy::cmd_destroy;
pub use init::{cmd_import, cmd_init};
pub use run::RunOptions;
pub use status::cmd_status;
pub use test_values::cmd_test;
pub use topsort::cmd_topsort;
