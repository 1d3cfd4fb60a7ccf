//! Reference pipeline topologies declared through the public graph API.

mod devsecops;

pub use devsecops::{
    devsecops, BEHAVE_IMAGE, BEHAVE_IMAGE_BUILD, BEHAVE_SCAN, DEVSECOPS_PIPELINE, GAUNTLT_TEST,
    JOERN_SCAN, JOERN_SCANNER_IMAGE, WEBGOAT_BUILD, WEBGOAT_DEPLOY, WEBGOAT_IMAGE,
};
