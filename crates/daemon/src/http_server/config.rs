use std::net::SocketAddr;

#[derive(Debug, Clone)]
pub struct Config {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
}

impl Config {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
        }
    }

    pub fn with_log_level(mut self, log_level: tracing::Level) -> Self {
        self.log_level = log_level;
        self
    }
}
