//! Mapping of AWS SDK failures onto [`ProviderError`]

use aws_sdk_organizations::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::migration::ProviderError;

/// Classify an SDK error once the client's retry policy has given up
pub(crate) fn classify_sdk_error<E, R>(error: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match &error {
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            classify_code(
                service_error.code().unwrap_or("Unknown"),
                service_error.message().unwrap_or_default(),
            )
        }
        SdkError::ConstructionFailure(_) => ProviderError::InvalidRequest {
            message: DisplayErrorContext(&error).to_string(),
        },
        _ => ProviderError::Transport {
            message: DisplayErrorContext(&error).to_string(),
        },
    }
}

pub(crate) fn classify_code(code: &str, message: &str) -> ProviderError {
    let message = message.to_string();
    match code {
        "DuplicateHandshakeException" => ProviderError::DuplicateHandshake { message },
        "OrganizationNotEmptyException" => ProviderError::OrganizationNotEmpty { message },
        "AccessDenied" | "AccessDeniedException" | "AccessDeniedForDependencyException" => {
            ProviderError::AccessDenied { message }
        }
        "TooManyRequestsException" | "Throttling" | "ThrottlingException" => {
            ProviderError::Throttled { message }
        }
        "InvalidInputException" | "ValidationException" => {
            ProviderError::InvalidRequest { message }
        }
        code if code.ends_with("NotFoundException") => ProviderError::NotFound {
            code: code.to_string(),
            message,
        },
        code => ProviderError::Service {
            code: code.to_string(),
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_and_deletion_codes_have_dedicated_variants() {
        assert!(classify_code("DuplicateHandshakeException", "dup").is_duplicate_handshake());
        assert_eq!(
            classify_code("OrganizationNotEmptyException", "busy"),
            ProviderError::OrganizationNotEmpty {
                message: "busy".to_string()
            }
        );
    }

    #[test]
    fn not_found_codes_keep_their_code() {
        assert_eq!(
            classify_code("OrganizationalUnitNotFoundException", "gone"),
            ProviderError::NotFound {
                code: "OrganizationalUnitNotFoundException".to_string(),
                message: "gone".to_string(),
            }
        );
    }

    #[test]
    fn throttling_and_unknown_codes() {
        assert!(matches!(
            classify_code("TooManyRequestsException", ""),
            ProviderError::Throttled { .. }
        ));
        assert!(matches!(
            classify_code("HandshakeConstraintViolationException", "limit"),
            ProviderError::Service { code, .. } if code == "HandshakeConstraintViolationException"
        ));
    }
}
