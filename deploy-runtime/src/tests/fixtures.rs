use std::sync::Arc;

use crate::{testing::FakeRuntime, DeploySettings, DeploymentService, Reference};

pub const BRANCH: &str = "feature/login_v2.1";
pub const TAG: &str = "v1.4.0+rc.2";

pub fn service() -> (DeploymentService, Arc<FakeRuntime>) {
    let runtime = Arc::new(FakeRuntime::new());
    let service = DeploymentService::new(DeploySettings::default(), runtime.clone());
    (service, runtime)
}

pub fn reference(raw: &str) -> Reference {
    Reference::parse(raw).expect("fixture reference is valid")
}
