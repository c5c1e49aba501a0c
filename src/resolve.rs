//! Include resolution: parses a root file and, transitively, every file it
//! includes, attaching each parsed journal to its `include` pragma.

use crate::ast::{IncludePragma, Journal, Node, Pragma};
use crate::error::{Error, Result};
use crate::parser::{JournalParser, LedgerParser};
use crate::transformer::transform_journal;
use crate::visitor::{Control, NodeVisitor, TraverserContext};

use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// How single-file parses are run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// On the task that asked for the file.
    Inline,
    /// On tokio's blocking pool, keeping the async workers free.
    #[default]
    Offloaded,
}

#[derive(Clone)]
pub struct Resolver {
    parser: Arc<dyn JournalParser>,
    strategy: ExecutionStrategy,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(Arc::new(LedgerParser))
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
pub struct ResolverBuilder {
    parser: Option<Arc<dyn JournalParser>>,
    strategy: ExecutionStrategy,
}

impl ResolverBuilder {
    pub fn parser(mut self, parser: impl JournalParser + 'static) -> Self {
        self.parser = Some(Arc::new(parser));
        self
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver {
            parser: self.parser.unwrap_or_else(|| Arc::new(LedgerParser)),
            strategy: self.strategy,
        }
    }
}

type Resolution = Pin<Box<dyn Future<Output = Result<Journal>> + Send>>;

impl Resolver {
    pub fn new(parser: Arc<dyn JournalParser>) -> Self {
        Resolver {
            parser,
            strategy: ExecutionStrategy::default(),
        }
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Parses `root` and every file it includes. Sibling includes are
    /// resolved concurrently; the first failure fails the whole resolution.
    pub async fn resolve(&self, root: impl AsRef<Path>) -> Result<Journal> {
        let root = normalise(root.as_ref());
        resolve_file(self.clone(), root, Arc::new(Vec::new())).await
    }

    /// Parses `root` alone. Its include pragmas stay unresolved.
    pub async fn resolve_without_includes(&self, root: impl AsRef<Path>) -> Result<Journal> {
        self.parse(normalise(root.as_ref())).await
    }

    /// [`Resolver::resolve`] for synchronous callers. Fails with
    /// [`Error::InvalidState`] when called from inside a tokio runtime.
    pub fn resolve_blocking(&self, root: impl AsRef<Path>) -> Result<Journal> {
        runtime()?.block_on(self.resolve(root))
    }

    pub fn resolve_without_includes_blocking(&self, root: impl AsRef<Path>) -> Result<Journal> {
        runtime()?.block_on(self.resolve_without_includes(root))
    }

    async fn parse(&self, path: PathBuf) -> Result<Journal> {
        match self.strategy {
            ExecutionStrategy::Inline => self.parser.parse_journal(&path),
            ExecutionStrategy::Offloaded => {
                let parser = Arc::clone(&self.parser);
                tokio::task::spawn_blocking(move || parser.parse_journal(&path)).await?
            }
        }
    }
}

/// Private runtime for the blocking entry points. Blocking on it from a
/// runtime thread would panic, so that case is refused.
fn runtime() -> Result<tokio::runtime::Runtime> {
    if tokio::runtime::Handle::try_current().is_ok() {
        return Err(Error::InvalidState(
            "blocking resolution called from inside a tokio runtime, use `resolve` instead".into(),
        ));
    }
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| {
            Error::InvalidState(format!("cannot start the resolution runtime: {}", err))
        })
}

/// `chain` lists the files whose resolution is waiting on this one.
fn resolve_file(resolver: Resolver, path: PathBuf, chain: Arc<Vec<PathBuf>>) -> Resolution {
    Box::pin(async move {
        if chain.contains(&path) {
            let mut chain = chain.to_vec();
            chain.push(path);
            return Err(Error::IncludeCycle { chain });
        }

        let journal = resolver.parse(path.clone()).await?;
        let targets: Vec<String> = journal
            .include_pragmas()
            .map(|pragma| pragma.filename().to_string())
            .collect();
        if targets.is_empty() {
            return Ok(journal);
        }

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!(file = %path.display(), includes = targets.len(), "resolving includes");

        let mut chain = chain.to_vec();
        chain.push(path);
        let chain = Arc::new(chain);

        let mut join_set: JoinSet<(usize, Result<Journal>)> = JoinSet::new();
        for (index, filename) in targets.iter().enumerate() {
            let target = normalise(&dir.join(filename));
            let resolver = resolver.clone();
            let chain = Arc::clone(&chain);
            join_set.spawn(async move { (index, resolve_file(resolver, target, chain).await) });
        }

        let mut resolved: Vec<Option<Arc<Journal>>> = vec![None; targets.len()];
        while let Some(joined) = join_set.join_next().await {
            // Returning early drops the set, which aborts the siblings still running.
            let (index, result) = joined?;
            resolved[index] = Some(Arc::new(result?));
        }

        transform_journal(journal, &mut AttachIncludes { resolved, next: 0 })
    })
}

/// Hands the n-th resolved journal to the n-th top level include pragma.
struct AttachIncludes {
    resolved: Vec<Option<Arc<Journal>>>,
    next: usize,
}

impl NodeVisitor for AttachIncludes {
    fn visit_include(
        &mut self,
        pragma: &IncludePragma,
        context: &TraverserContext<'_>,
    ) -> Control {
        if !context.is_top_level() {
            return Control::Continue;
        }
        let nested = self.resolved.get_mut(self.next).and_then(Option::take);
        self.next += 1;

        match nested {
            Some(journal) => {
                let pragma = pragma.transform(|draft| draft.journal = Some(journal));
                Control::Replace(Node::Declaration(Pragma::Include(pragma).into()))
            }
            None => Control::Continue,
        }
    }
}

/// Removes `.` and folds `..` without touching the file system.
pub fn normalise(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Directive, JournalDeclaration};
    use crate::parser::parse_str;
    use anyhow::{anyhow, Result};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    fn nested<'a>(journal: &'a Journal, filename: &str) -> Result<&'a Journal> {
        journal
            .include_pragmas()
            .find(|pragma| pragma.filename() == filename)
            .and_then(IncludePragma::journal)
            .map(|journal| &**journal)
            .ok_or(anyhow!("{} is not resolved", filename))
    }

    /// Serves files from memory and counts parses.
    struct MemoryParser {
        files: HashMap<PathBuf, String>,
        parses: Arc<AtomicUsize>,
    }

    impl JournalParser for MemoryParser {
        fn parse_journal(&self, path: &Path) -> crate::error::Result<Journal> {
            self.parses.fetch_add(1, Ordering::SeqCst);
            let input = self.files.get(path).ok_or_else(|| Error::Io {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })?;
            parse_str(input, Some(path))
        }
    }

    #[tokio::test]
    async fn resolve_nested_includes() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(dir.path(), "main.bean", "include \"sub/a.bean\"\n")?;
        write(dir.path(), "sub/a.bean", "include \"../b.bean\"\n")?;
        write(dir.path(), "b.bean", "2021-01-01 close Assets:Cash\n")?;

        let journal = Resolver::default().resolve(&root).await?;
        let a = nested(&journal, "sub/a.bean")?;
        let b = nested(a, "../b.bean")?;

        assert_eq!(b.len(), 1);
        assert!(matches!(b.directives().next(), Some(Directive::Close(_))));
        assert_eq!(
            b.location().file(),
            Some(normalise(&dir.path().join("b.bean")).as_path())
        );
        Ok(())
    }

    #[tokio::test]
    async fn failing_sibling_fails_resolution() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(
            dir.path(),
            "main.bean",
            "include \"a.bean\"\ninclude \"missing.bean\"\ninclude \"c.bean\"\n",
        )?;
        write(dir.path(), "a.bean", "2021-01-01 close Assets:A\n")?;
        write(dir.path(), "c.bean", "2021-01-01 close Assets:C\n")?;

        for strategy in [ExecutionStrategy::Inline, ExecutionStrategy::Offloaded] {
            let resolver = Resolver::builder().strategy(strategy).build();
            match resolver.resolve(&root).await {
                Err(Error::Io { path, .. }) => assert!(path.ends_with("missing.bean")),
                other => panic!("io error expected with {:?}, got {:?}", strategy, other),
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn syntax_error_in_include_fails_resolution() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(dir.path(), "main.bean", "include \"bad.bean\"\n")?;
        write(dir.path(), "bad.bean", "2021-01-01 bogus\n")?;

        let err = Resolver::default().resolve(&root).await.err();
        assert!(matches!(err, Some(Error::Syntax { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn cycle_is_reported_with_its_chain() -> Result<()> {
        let files = HashMap::from([
            (PathBuf::from("a.bean"), "include \"b.bean\"\n".to_string()),
            (PathBuf::from("b.bean"), "include \"./a.bean\"\n".to_string()),
        ]);
        let resolver = Resolver::builder()
            .parser(MemoryParser {
                files,
                parses: Arc::default(),
            })
            .strategy(ExecutionStrategy::Inline)
            .build();

        match resolver.resolve("a.bean").await {
            Err(Error::IncludeCycle { chain }) => assert_eq!(
                chain,
                vec![
                    PathBuf::from("a.bean"),
                    PathBuf::from("b.bean"),
                    PathBuf::from("a.bean")
                ]
            ),
            other => panic!("cycle expected, got {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn diamond_is_resolved_on_both_branches() -> Result<()> {
        let parses = Arc::new(AtomicUsize::new(0));
        let files = HashMap::from([
            (
                PathBuf::from("root.bean"),
                "include \"left.bean\"\ninclude \"right.bean\"\n".to_string(),
            ),
            (PathBuf::from("left.bean"), "include \"shared.bean\"\n".to_string()),
            (PathBuf::from("right.bean"), "include \"shared.bean\"\n".to_string()),
            (
                PathBuf::from("shared.bean"),
                "2021-01-01 commodity USD\n".to_string(),
            ),
        ]);

        for strategy in [ExecutionStrategy::Inline, ExecutionStrategy::Offloaded] {
            parses.store(0, Ordering::SeqCst);
            let resolver = Resolver::builder()
                .parser(MemoryParser {
                    files: files.clone(),
                    parses: Arc::clone(&parses),
                })
                .strategy(strategy)
                .build();

            let journal = resolver.resolve("root.bean").await?;
            assert!(nested(nested(&journal, "left.bean")?, "shared.bean")?.len() == 1);
            assert!(nested(nested(&journal, "right.bean")?, "shared.bean")?.len() == 1);
            assert_eq!(parses.load(Ordering::SeqCst), 5);
        }
        Ok(())
    }

    #[tokio::test]
    async fn without_includes_leaves_pragmas_unresolved() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(dir.path(), "main.bean", "include \"nowhere.bean\"\n")?;

        let journal = Resolver::default().resolve_without_includes(&root).await?;
        let pragma = journal.include_pragmas().next().ok_or(anyhow!("include expected"))?;
        assert!(!pragma.is_resolved());
        Ok(())
    }

    #[tokio::test]
    async fn blocking_resolution_inside_runtime_is_refused() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(dir.path(), "main.bean", "2021-01-01 close Assets:Cash\n")?;

        let resolver = Resolver::default();
        assert!(matches!(
            resolver.resolve_blocking(&root),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            resolver.resolve_without_includes_blocking(&root),
            Err(Error::InvalidState(_))
        ));
        assert_eq!(resolver.resolve(&root).await?.len(), 1);
        Ok(())
    }

    #[test]
    fn blocking_resolution() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let root = write(dir.path(), "main.bean", "; top\ninclude \"a.bean\"\n")?;
        write(dir.path(), "a.bean", "option \"title\" \"x\"\n")?;

        let journal = Resolver::default().resolve_blocking(&root)?;
        assert!(matches!(
            journal.declarations()[0],
            JournalDeclaration::Comment(_)
        ));
        assert_eq!(nested(&journal, "a.bean")?.len(), 1);
        Ok(())
    }

    #[test]
    fn normalise_folds_dots() {
        assert_eq!(normalise(Path::new("a/./b/../c.bean")), PathBuf::from("a/c.bean"));
        assert_eq!(normalise(Path::new("../x/../y")), PathBuf::from("../y"));
        assert_eq!(normalise(Path::new("/../z")), PathBuf::from("/z"));
        assert_eq!(normalise(Path::new("./")), PathBuf::from("."));
    }
}
