use super::*;

#[test]
fn intake_error_codes_are_stable() {
    assert_eq!(IntakeError::SignatureInvalid.code(), "webhook_signature_invalid");
    assert_eq!(IntakeError::SecretUnavailable.code(), "webhook_secret_unavailable");
    assert_eq!(IntakeError::SecretEmpty.code(), "webhook_secret_empty");
    assert_eq!(
        IntakeError::StorageReadFailed { message: "x".into() }.code(),
        "storage_read_failed"
    );
    assert_eq!(
        IntakeError::StorageWriteFailed { message: "x".into() }.code(),
        "storage_write_failed"
    );
    assert_eq!(
        IntakeError::DeliveryCreationFailed { message: "x".into() }.code(),
        "webhook_delivery_creation_failed"
    );
}

#[test]
fn only_infrastructure_errors_are_retryable() {
    assert!(!IntakeError::SignatureInvalid.is_retryable());
    assert!(!IntakeError::SecretUnavailable.is_retryable());
    assert!(!IntakeError::SecretEmpty.is_retryable());
    assert!(IntakeError::StorageReadFailed { message: "x".into() }.is_retryable());
    assert!(IntakeError::StorageWriteFailed { message: "x".into() }.is_retryable());
}

#[test]
fn replay_error_forwards_inner_codes() {
    let queue_err = ReplayError::from(QueueError::OperationFailed { message: "x".into() });
    assert_eq!(queue_err.code(), "replay_queue_operation_failed");

    let intake_err = ReplayError::from(IntakeError::SignatureInvalid);
    assert_eq!(intake_err.code(), "webhook_signature_invalid");
}
