mod authorize;
mod health;

pub use authorize::{AuthorizeRequestBody, DecisionResponse, ResourceRequestBody};
pub use health::{HealthDependencyStatus, HealthResponse};

#[cfg(test)]
mod tests {
    use super::{
        AuthorizeRequestBody, DecisionResponse, HealthDependencyStatus, HealthResponse,
        ResourceRequestBody,
    };

    use std::path::Path;

    use crate::error::ErrorResponse;
    use ts_rs::Config;
    use ts_rs::TS;

    #[test]
    fn export_ts_bindings() -> Result<(), ts_rs::ExportError> {
        let config = Config::default();

        AuthorizeRequestBody::export(&config)?;
        ResourceRequestBody::export(&config)?;
        DecisionResponse::export(&config)?;
        HealthResponse::export(&config)?;
        HealthDependencyStatus::export(&config)?;
        ErrorResponse::export(&config)?;

        if std::env::var_os("TS_RS_EXPORT_DIR").is_none() {
            let bindings = Path::new(env!("CARGO_MANIFEST_DIR")).join("bindings");
            for file in ["authorize-request-body.ts", "decision-response.ts", "error-response.ts"] {
                assert!(bindings.join(file).is_file(), "missing binding {file}");
            }
        }

        Ok(())
    }
}
