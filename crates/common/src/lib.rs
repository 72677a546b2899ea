use thiserror::Error;

pub mod types;
pub mod utils;
pub mod env;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("upstream rejected: {0}")]
    Upstream(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_type_ok() {
        let h = types::Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn core_error_display() {
        let e = CoreError::Upstream("bad credentials".into());
        assert_eq!(e.to_string(), "upstream rejected: bad credentials");
    }
}
