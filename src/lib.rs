pub mod logging;
pub mod magnifier;
pub mod settings;
pub mod win_util;
