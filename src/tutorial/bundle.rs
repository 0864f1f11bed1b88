use crate::domain::model::ArchiveEntry;
use crate::tutorial::history::{ProjectAsset, ProjectHistory, CODE_FILE_BASENAME};
use crate::tutorial::markdown::{render_markdown, render_tutorial, RenderedTutorial};
use crate::tutorial::patch::escape_html;
use crate::utils::error::Result;

/// The rendered form of one tutorial.
#[derive(Debug, Clone)]
pub struct TutorialBundle {
    pub top_level_directory_name: String,
    pub tip_oid: String,
    pub final_code_text: String,
    pub tutorial_html: String,
    pub summary_html: String,
    pub assets: Vec<ProjectAsset>,
}

impl TutorialBundle {
    pub fn from_project_history(history: &ProjectHistory) -> Result<Self> {
        let top_level_directory_name = history.top_level_directory_name()?;
        let tip_oid = history.tip_oid_string();

        let rendered = render_tutorial(&history.tutorial_text()?, |slug| {
            Ok(history.code_patch_against_parent(slug)?.to_html(slug))
        })?;

        let summary_html = match history.summary_text()? {
            Some(summary) => render_markdown(&summary),
            None => rendered.front_matter.clone(),
        };

        let bundle = Self {
            tutorial_html: tutorial_html(&tip_oid, &rendered),
            top_level_directory_name,
            tip_oid,
            final_code_text: history.final_code_text()?,
            summary_html,
            assets: history.all_project_assets()?,
        };

        tracing::debug!(
            "Bundled tutorial '{}': {} chapters, {} assets",
            bundle.top_level_directory_name,
            rendered.chapters.len(),
            bundle.assets.len()
        );

        Ok(bundle)
    }

    /// The summary wrapped in its `tutorial-summary` div, optionally
    /// carrying the tutorial's name for the index.
    pub fn summary_div(&self, tutorial_name: Option<&str>) -> String {
        let name_attr = tutorial_name
            .map(|name| format!(" data-tutorial-name=\"{}\"", escape_html(name)))
            .unwrap_or_default();
        format!(
            "<div class=\"tutorial-summary\"{}>\n{}</div>\n",
            name_attr, self.summary_html
        )
    }

    pub fn archive_entries(&self) -> Vec<ArchiveEntry> {
        let dir = &self.top_level_directory_name;
        let mut entries = vec![
            ArchiveEntry::new(format!("{}/tutorial.html", dir), self.tutorial_html.as_bytes()),
            ArchiveEntry::new(format!("{}/summary.html", dir), self.summary_div(None)),
            ArchiveEntry::new(
                format!("{}/code/{}", dir, CODE_FILE_BASENAME),
                self.final_code_text.as_bytes(),
            ),
        ];

        entries.extend(
            self.assets
                .iter()
                .map(|asset| ArchiveEntry::new(asset.path.clone(), asset.data.clone())),
        );

        entries
    }
}

fn tutorial_html(tip_oid: &str, rendered: &RenderedTutorial) -> String {
    let mut html = format!(
        "<div class=\"tutorial-bundle\" data-tip-sha1=\"{}\">\n<div class=\"front-matter\">\n{}</div>\n",
        tip_oid, rendered.front_matter
    );
    for chapter in &rendered.chapters {
        html.push_str("<div class=\"chapter-content\">\n");
        html.push_str(chapter);
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
    html
}
