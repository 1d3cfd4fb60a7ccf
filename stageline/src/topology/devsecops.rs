//! The DevSecOps reference pipeline.
//!
//! Builds WebGoat, scans the build output with Joern, packages the Behave
//! scanner image, deploys WebGoat and runs the dynamic scans against the
//! deployment:
//!
//! ```text
//! webgoat-build ──results──► joern-scan
//!        │
//!        └────results──► webgoat-deploy ──► behave-scan
//!                               │   ▲             ▲
//!                               ▼   │             │
//!                        gauntlt-test  behave-image-build
//! ```
//!
//! Context values read from the configuration:
//!
//! | key             | default                 |
//! |-----------------|-------------------------|
//! | `webgoat_owner` | `WebGoat`               |
//! | `branch_or_ref` | `main`                  |
//! | `network`       | `devsecops-vpc`         |
//! | `deploy_role`   | `webgoat-deploy-role`   |

use crate::config::PipelineConfig;
use crate::core::{BuildEnvironment, ComputeTier, EnvValue, ImageRepositorySpec, RepositoryRef};
use crate::pipeline::{PipelineGraph, Stage};

/// Pipeline name.
pub const DEVSECOPS_PIPELINE: &str = "devsecops";

/// Imported image repository holding the Joern scanner.
pub const JOERN_SCANNER_IMAGE: &str = "joern-scanner";
/// Managed image repository for the Behave scanner.
pub const BEHAVE_IMAGE: &str = "behave-image";
/// Managed image repository for WebGoat.
pub const WEBGOAT_IMAGE: &str = "webgoat-image";

/// Builds the WebGoat jar.
pub const WEBGOAT_BUILD: &str = "webgoat-build";
/// Static analysis of the build output.
pub const JOERN_SCAN: &str = "joern-scan";
/// Builds and pushes the Behave scanner image.
pub const BEHAVE_IMAGE_BUILD: &str = "behave-image-build";
/// Packages and deploys WebGoat.
pub const WEBGOAT_DEPLOY: &str = "webgoat-deploy";
/// Behaviour-driven scan of the deployment.
pub const BEHAVE_SCAN: &str = "behave-scan";
/// Gauntlt attack tests against the deployment.
pub const GAUNTLT_TEST: &str = "gauntlt-test";

const SCANNER_OWNER: &str = "yschu710";
const SCANNER_REPOSITORY: &str = "devsecops-jenkins-scanner";
const APP_URL: &str = "http://webgoat.svc.test.local:8080";

fn script(name: &str) -> String {
    format!("codebuild_stack/codebuild_{name}_buildspec.yaml")
}

/// Declares the DevSecOps pipeline.
///
/// The returned graph is unresolved; pass it to
/// [`PipelineCompiler::compile`](crate::pipeline::PipelineCompiler::compile).
#[must_use]
pub fn devsecops(config: &PipelineConfig) -> PipelineGraph {
    let webgoat_owner = config.context_or("webgoat_owner", "WebGoat");
    let branch = config.context_or("branch_or_ref", "main");
    let network = config.context_or("network", "devsecops-vpc");
    let deploy_role = config.context_or("deploy_role", "webgoat-deploy-role");
    let scanner = || RepositoryRef::github(SCANNER_OWNER, SCANNER_REPOSITORY);

    let mut graph = PipelineGraph::new(DEVSECOPS_PIPELINE, config.clone());

    let joern = graph.add_image_repository(ImageRepositorySpec::imported(JOERN_SCANNER_IMAGE));
    let behave = graph.add_image_repository(ImageRepositorySpec::managed(BEHAVE_IMAGE));
    let webgoat = graph.add_image_repository(ImageRepositorySpec::managed(WEBGOAT_IMAGE));

    let build = graph.add_stage(
        Stage::new(WEBGOAT_BUILD, RepositoryRef::github(webgoat_owner, "WebGoat"))
            .with_script(script("webgoat"))
            .with_environment(
                BuildEnvironment::new()
                    .privileged()
                    .with_compute(ComputeTier::Medium)
                    .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId)
                    .with_variable("REGION", EnvValue::Region),
            )
            .with_output("results"),
    );

    graph.add_stage(
        Stage::new(JOERN_SCAN, build.output("results"))
            .with_script(script("joern"))
            .with_environment(
                BuildEnvironment::new()
                    .privileged()
                    .with_compute(ComputeTier::Large)
                    .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId)
                    .with_variable("REGION", EnvValue::Region),
            )
            .with_image(joern.pull()),
    );

    let image_build = graph.add_stage(
        Stage::new(BEHAVE_IMAGE_BUILD, scanner().with_reference(branch.clone()))
            .with_script(script("behave_image_build"))
            .with_environment(
                BuildEnvironment::new()
                    .privileged()
                    .with_variable("ECR_URL", behave.uri())
                    .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId),
            )
            .with_image(behave.pull_push()),
    );

    let deploy = graph.add_stage(
        Stage::new(WEBGOAT_DEPLOY, build.output("results"))
            .with_script(script("webgoat_deploy"))
            .with_secondary_source(
                scanner()
                    .with_reference(branch.clone())
                    .with_identifier("secondary_source_1"),
            )
            .with_role(deploy_role)
            .with_environment(
                BuildEnvironment::new()
                    .privileged()
                    .with_variable("ECR_URL", webgoat.uri())
                    .with_variable("ECR_NAME", webgoat.name_value())
                    .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId),
            )
            .with_image(webgoat.pull_push()),
    );

    graph.add_stage(
        Stage::new(BEHAVE_SCAN, scanner().with_reference(branch))
            .with_script(script("behave_scanning"))
            .with_environment(
                BuildEnvironment::new()
                    .privileged()
                    .with_variable("ECR_URL", behave.uri())
                    .with_variable("AWS_ACCOUNT_ID", EnvValue::AccountId)
                    .with_variable("APP_URL", APP_URL),
            )
            .with_image(behave.pull())
            .with_network(network.clone())
            .run_after(deploy.name())
            .run_after(image_build.name()),
    );

    graph.add_stage(
        Stage::new(GAUNTLT_TEST, scanner())
            .with_script(script("gauntlt"))
            .with_environment(BuildEnvironment::new().privileged())
            .with_network(network)
            .run_after(deploy.name()),
    );

    graph
}
