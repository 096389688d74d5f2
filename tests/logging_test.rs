use tracing::{error, info, warn};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_info_logging() {
    info!("This is an info message");
    assert!(logs_contain("This is an info message"));
}

#[traced_test]
#[test]
fn test_error_logging() {
    error!("This is an error message");
    assert!(logs_contain("This is an error message"));
}

#[traced_test]
#[test]
fn test_structured_fields_logged() {
    warn!(points = -2.0, "penalty recorded");
    assert!(logs_contain("penalty recorded"));
    assert!(logs_contain("points=-2.0"));
}
