pub mod cli;
pub mod compose;
pub mod mode;
pub mod preflight;

pub use compose::{
    apply, detect_compose, lifecycle_command, lifecycle_plan, tear_down, ComposeError,
    ComposeResult, ComposeRuntime, VERB_DOWN, VERB_UP_DETACHED,
};
pub use mode::{
    resolve, DeployMode, OrchestrationRequest, PortOverride, RequestError, Service,
    DEV_COMPOSE_FILE, PROD_COMPOSE_FILE,
};
pub use preflight::{
    default_checks, BranchGuardCheck, Check, CheckFailure, CheckOutcome, EngineCliCheck,
    EngineDaemonCheck, GitIdentityCheck, GitRepoCheck, Preflight, RemoteReachableCheck,
    SshKeyCheck, DEFAULT_REMOTE, PROTECTED_BRANCH,
};
