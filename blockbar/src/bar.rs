//! The ordered set of top-level blocks and frame emission

use crate::block::{Block, Timestamp};
use crate::config::Config;
use crate::protocol::{Entry, Output};
use std::io;
use std::sync::Arc;

pub struct Bar {
    blocks: Vec<Arc<Block>>,
}

impl Bar {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks: blocks.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_config(config: Config) -> Self {
        Self::new(config.blocks.into_iter().map(Block::from_config).collect())
    }

    pub fn blocks(&self) -> &[Arc<Block>] {
        &self.blocks
    }

    /// Every block, composite children included, parents first
    pub fn visit(&self, f: &mut dyn FnMut(&Arc<Block>)) {
        for block in &self.blocks {
            block.visit(f);
        }
    }

    /// Start one update loop per block
    pub fn start(&self) -> io::Result<()> {
        for block in &self.blocks {
            block.spawn()?;
        }
        Ok(())
    }

    /// Refresh every block once and wait for all of them
    ///
    /// Blocks that never refresh on a schedule would otherwise stay empty
    /// until their first click or signal.
    pub fn prime(&self, timestamp: Timestamp) {
        self.visit(&mut |block| block.request_update(timestamp, false));
        self.visit(&mut |block| block.request_update(timestamp, true));
    }

    pub fn tick(&self, timestamp: Timestamp) {
        for block in &self.blocks {
            block.tick(timestamp);
        }
    }

    /// Wait until every needed block is fresh as of `timestamp`
    pub fn wait_needed(&self, timestamp: Timestamp) {
        self.visit(&mut |block| block.wait_if_needed(timestamp));
    }

    pub fn frame(&self) -> Vec<Entry> {
        let mut entries = Vec::new();
        for block in &self.blocks {
            block.entries(&mut entries);
        }
        entries
    }

    /// Find the top-level block an instance path starts at
    ///
    /// Returns the block and the remaining path below it. An exact top-level
    /// match wins over splitting at the first dot.
    pub fn resolve<'a>(&self, instance: &'a str) -> Option<(&Arc<Block>, &'a str)> {
        if let Some(block) = self.blocks.iter().find(|b| b.instance() == instance) {
            return Some((block, ""));
        }
        let (head, rest) = instance.split_once('.')?;
        self.blocks
            .iter()
            .find(|b| b.instance() == head)
            .map(|block| (block, rest))
    }
}

/// Writes frames of one bar into one output
#[derive(Clone)]
pub struct Emitter {
    bar: Arc<Bar>,
    output: Arc<Output>,
}

impl Emitter {
    pub fn new(bar: Arc<Bar>, output: Arc<Output>) -> Self {
        Self { bar, output }
    }

    pub fn bar(&self) -> &Arc<Bar> {
        &self.bar
    }

    pub fn emit(&self) -> io::Result<()> {
        self.output.emit_with(|| self.bar.frame())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{CompositeSettings, Identity, Reading, RefreshContext, Settings, Source};
    use std::time::Instant;

    struct Fixed;

    impl Source for Fixed {
        fn refresh(&mut self, _ctx: &RefreshContext<'_>) -> anyhow::Result<Reading> {
            Ok(Reading::new())
        }
    }

    fn block(name: &str) -> Block {
        Block::new(
            Identity::new("custom", name),
            Settings::with_format(name),
            Box::new(Fixed),
        )
    }

    fn bar() -> Bar {
        let parent = Identity::new("internal/menu", "m");
        let child = Block::new(
            parent.child("custom", "c"),
            Settings::with_format("c"),
            Box::new(Fixed),
        );
        let menu = Block::new(parent, Settings::with_format("m"), Box::new(Fixed))
            .with_children(CompositeSettings::default(), vec![child]);
        Bar::new(vec![block("a"), menu, block("x.y")])
    }

    #[test]
    fn test_resolve() {
        let bar = bar();

        let (block, sub) = bar.resolve("a").unwrap();
        assert_eq!((block.instance(), sub), ("a", ""));

        let (block, sub) = bar.resolve("m.c").unwrap();
        assert_eq!((block.instance(), sub), ("m", "c"));

        let (block, sub) = bar.resolve("x.y").unwrap();
        assert_eq!((block.instance(), sub), ("x.y", ""));

        assert!(bar.resolve("nope").is_none());
        assert!(bar.resolve("nope.c").is_none());
    }

    #[test]
    fn test_prime_and_frame() {
        let bar = bar();
        bar.start().unwrap();
        bar.prime(Instant::now());

        let texts: Vec<String> = bar.frame().into_iter().map(|e| e.full_text).collect();
        assert_eq!(texts, vec!["a", "m", "x.y"]);

        let mut visited = Vec::new();
        bar.visit(&mut |block| visited.push(block.instance().to_string()));
        assert_eq!(visited, vec!["a", "m", "m.c", "x.y"]);
    }
}
