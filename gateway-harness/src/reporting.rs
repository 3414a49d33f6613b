use std::{any::Any, thread};
use tracing::{error, info};

/// Logs how a test ended. A failure is only reported here; re-raising it is
/// up to the caller so sibling tests keep running.
pub fn report_outcome<T>(test_name: &str, outcome: &thread::Result<T>) {
    match outcome {
        Ok(_) => info!(test = test_name, "test passed"),
        Err(payload) => error!(
            test = test_name,
            reason = %panic_message(payload.as_ref()),
            "test failed"
        ),
    }
}

/// The message a panic was raised with, when it carried one.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::from("unknown panic payload")
    }
}
