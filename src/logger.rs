use std::path::Path;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::container::symbol_representation;
use crate::huffman::{CodeTable, FrequencyTable};

const CONFIG_FILE: &str = "log4rs.yaml";
const CONFIG_FILE_VARIABLE: &str = "HUFFMAN_CONTAINER_LOG_CONFIG";

#[ctor::ctor]
fn init() {
    let config_file =
        std::env::var(CONFIG_FILE_VARIABLE).unwrap_or_else(|_| CONFIG_FILE.to_owned());
    if Path::new(&config_file).is_file() {
        if let Err(e) = log4rs::init_file(&config_file, Default::default()) {
            eprintln!("Unable to load logging configuration '{}': {}", config_file, e);
        }
        return;
    }
    init_fallback();
}

fn init_fallback() {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {M} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Warn));
    if let Ok(config) = config {
        let _ = log4rs::init_config(config);
    }
}

pub fn log_code_table(frequencies: &FrequencyTable, code_table: &CodeTable) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    for (symbol, code) in code_table.iter() {
        log::debug!(
            "{:>6} {:02X} f:{} len:{} {}",
            symbol_representation(symbol),
            symbol,
            frequencies.get(symbol),
            code.len(),
            code
        );
    }
}
