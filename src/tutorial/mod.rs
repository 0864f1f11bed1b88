pub mod bundle;
pub mod collection;
pub mod history;
pub mod markdown;
pub mod patch;
pub mod release;

pub use bundle::TutorialBundle;
pub use collection::TutorialCollection;
pub use history::{ProjectAsset, ProjectCommit, ProjectHistory};
pub use patch::CodePatch;
