use crate::block::{Reading, RefreshContext, Source};

/// Composite label, it only renders its own format
///
/// Expanding, collapsing and child ownership live in the block engine.
pub struct Menu;

impl Source for Menu {
    fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
        Ok(Reading::new())
    }
}
