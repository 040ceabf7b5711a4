//! Role hierarchy diagram as Markdown with a Mermaid flowchart

use crate::error::Result;
use crate::roles::RoleGraph;
use crate::types::{Role, RoleId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt::Write;

/// Snapshot of every role and its direct parents
#[derive(Debug, Clone, Default)]
pub struct RoleDiagram {
    entries: Vec<(Role, Vec<Role>)>,
}

impl RoleDiagram {
    /// Read all roles and their parents from the graph
    pub async fn build<G>(graph: &G) -> Result<Self>
    where
        G: RoleGraph + ?Sized,
    {
        let mut entries = Vec::new();
        for role in graph.list_roles().await? {
            let parents = graph.parents_of(&role.id).await?;
            entries.push((role, parents));
        }
        Ok(Self { entries })
    }

    /// Roles without parents
    pub fn roots(&self) -> Vec<&Role> {
        self.entries
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(role, _)| role)
            .collect()
    }

    /// Roles that are nobody's parent
    pub fn leaves(&self) -> Vec<&Role> {
        let parent_ids: HashSet<&RoleId> = self
            .entries
            .iter()
            .flat_map(|(_, parents)| parents.iter().map(|p| &p.id))
            .collect();

        self.entries
            .iter()
            .map(|(role, _)| role)
            .filter(|role| !parent_ids.contains(&role.id))
            .collect()
    }

    /// Render the Markdown document
    pub fn render(&self, generated_at: DateTime<Utc>) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# Role Hierarchy Diagram");
        let _ = writeln!(out);
        let _ = writeln!(out, "Generated on: {}", generated_at.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out);
        let _ = writeln!(out, "```mermaid");
        let _ = writeln!(out, "flowchart TD");

        for (role, _) in &self.entries {
            let _ = writeln!(out, "    {}[\"{}\"]", node_id(&role.slug), label(&role.name));
        }

        for (role, parents) in &self.entries {
            for parent in parents {
                let _ = writeln!(out, "    {} --> {}", node_id(&parent.slug), node_id(&role.slug));
            }
        }

        let roots = self.roots();
        let leaves = self.leaves();

        if !roots.is_empty() || !leaves.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "    %% Root and leaf roles");
        }
        if !roots.is_empty() {
            let _ = writeln!(out, "    class {} root", class_list(&roots));
        }
        if !leaves.is_empty() {
            let _ = writeln!(out, "    class {} leaf", class_list(&leaves));
        }
        let _ = writeln!(out, "    classDef root fill:#dbeafe,stroke:#1d4ed8");
        let _ = writeln!(out, "    classDef leaf fill:#dcfce7,stroke:#15803d");
        let _ = writeln!(out, "```");
        let _ = writeln!(out);

        let _ = writeln!(out, "## Role Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Role | Slug | Weight | Description | Parent Roles |");
        let _ = writeln!(out, "|------|------|--------|-------------|--------------|");

        for (role, parents) in &self.entries {
            let parent_names = if parents.is_empty() {
                "None".to_string()
            } else {
                parents
                    .iter()
                    .map(|p| cell(&p.name))
                    .collect::<Vec<_>>()
                    .join(", ")
            };

            let _ = writeln!(
                out,
                "| {} | `{}` | {} | {} | {} |",
                cell(&role.name),
                cell(&role.slug),
                role.weight,
                role.description.as_deref().map(cell).unwrap_or_else(|| "N/A".to_string()),
                parent_names
            );
        }

        out
    }
}

fn class_list(roles: &[&Role]) -> String {
    roles
        .iter()
        .map(|r| node_id(&r.slug))
        .collect::<Vec<_>>()
        .join(",")
}

/// Mermaid node ids allow only word characters and hyphens
fn node_id(slug: &str) -> String {
    slug.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

fn label(name: &str) -> String {
    name.replace('"', "#quot;")
}

fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
