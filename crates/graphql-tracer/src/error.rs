/// Errors surfaced by the tracer's fallible edges.
///
/// Redaction and tree construction recover locally and never error; the only
/// genuine failure seam is the hand-off to the reporting sink.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("trace sink queue is full")]
    SinkFull,

    #[error("trace sink is closed")]
    SinkClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(TracerError::SinkFull.to_string(), "trace sink queue is full");
        assert_eq!(TracerError::SinkClosed.to_string(), "trace sink is closed");
    }
}
