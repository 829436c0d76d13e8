//! Run a unit of work inside a provisioned environment.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use tracing::error;

use crate::environment::{
    EnvironmentDisposer, EnvironmentProvisioner, EnvironmentResult, ProvisionRequest, TeardownPlan,
};
use crate::error::OrchestrationError;

/// Provision, run `body`, then dispose exactly once.
///
/// Disposal happens whether provisioning failed, `body` failed, or `body`
/// panicked (the panic is resumed afterwards). When both the work and the
/// teardown fail, the work's error is returned and the teardown error logged.
pub fn with_environment<T, E, F>(
    provisioner: &EnvironmentProvisioner<'_>,
    disposer: &EnvironmentDisposer<'_>,
    request: &ProvisionRequest,
    ignore_failure: bool,
    body: F,
) -> Result<T, E>
where
    E: From<OrchestrationError>,
    F: FnOnce(&EnvironmentResult) -> Result<T, E>,
{
    let mut plan = TeardownPlan::new(ignore_failure);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let environment = provisioner.provision(request, &mut plan).map_err(E::from)?;
        body(&environment)
    }));

    let disposal = disposer.dispose(plan);

    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(panic) => {
            if let Err(err) = &disposal {
                error!(error = %err, "teardown failed while unwinding");
            }
            resume_unwind(panic)
        }
    };

    match (outcome, disposal) {
        (Ok(value), Ok(_)) => Ok(value),
        (Ok(_), Err(teardown)) => Err(teardown.into()),
        (Err(err), Ok(_)) => Err(err),
        (Err(err), Err(teardown)) => {
            error!(error = %teardown, "teardown failed after an earlier failure");
            Err(err)
        }
    }
}
