use snafu::{ResultExt, Snafu};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Symlinks followed in a single resolution before giving up.
const MAX_SYMLINK_FOLLOWS: usize = 40;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SandboxError {
    #[snafu(display("path escapes sandbox: {raw}"))]
    SandboxViolation { raw: String, resolved: PathBuf },

    #[snafu(display("Failed to resolve sandbox root '{}': {}", root.display(), source))]
    InvalidRoot { source: io::Error, root: PathBuf },

    #[snafu(display("Sandbox root '{}' is not a directory", root.display()))]
    RootNotDirectory { root: PathBuf },

    #[snafu(display("Failed to resolve path '{raw}': {source}"))]
    Canonicalize { source: io::Error, raw: String },

    #[snafu(display("too many levels of symbolic links: {raw}"))]
    SymlinkLoop { raw: String },
}

pub type Result<T, E = SandboxError> = std::result::Result<T, E>;

/// Maps caller-supplied paths onto the filesystem below a single root.
///
/// The root is canonicalized once, at construction. Every path handed out by
/// [`Sandbox::resolve`] is the root itself or one of its descendants.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = fs::canonicalize(root).context(InvalidRootSnafu {
            root: root.to_path_buf(),
        })?;
        if !canonical.is_dir() {
            return Err(SandboxError::RootNotDirectory { root: canonical });
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `raw` to an absolute path inside the root.
    ///
    /// Leading separators are stripped so `/src/main.rs` and `src/main.rs`
    /// address the same file. Components are walked one at a time from the
    /// root: symlinks are followed (dangling ones included), `..` applies to
    /// whatever the previous component really resolved to, and components
    /// that don't exist yet are appended as they are.
    pub fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let relative = Path::new(raw.trim_start_matches(['/', '\\']));
        let resolved = resolve_from(&self.root, relative, raw)?;

        // `Path::starts_with` compares whole components, so a root of `/a/b`
        // never admits `/a/b2/x`.
        if !resolved.starts_with(&self.root) {
            debug!(raw, resolved = %resolved.display(), "rejected path outside sandbox");
            return Err(SandboxError::SandboxViolation {
                raw: raw.to_string(),
                resolved,
            });
        }

        Ok(resolved)
    }
}

enum Step {
    Root(PathBuf),
    Parent,
    Name(OsString),
}

/// Queue the components of `path` so the first one is popped first.
fn push_steps(pending: &mut Vec<Step>, path: &Path) {
    let mut root = PathBuf::new();
    let mut steps = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => root.push(component),
            Component::CurDir => {}
            Component::ParentDir => steps.push(Step::Parent),
            Component::Normal(name) => steps.push(Step::Name(name.to_os_string())),
        }
    }
    pending.extend(steps.into_iter().rev());
    if !root.as_os_str().is_empty() {
        pending.push(Step::Root(root));
    }
}

/// Non-strict realpath: like `fs::canonicalize`, except that missing
/// components are kept instead of failing.
fn resolve_from(base: &Path, relative: &Path, raw: &str) -> Result<PathBuf> {
    let mut resolved = base.to_path_buf();
    let mut pending = Vec::new();
    push_steps(&mut pending, relative);
    let mut follows = 0;

    while let Some(step) = pending.pop() {
        match step {
            Step::Root(root) => resolved = root,
            Step::Parent => {
                resolved.pop();
            }
            Step::Name(name) => {
                let candidate = resolved.join(&name);
                match fs::symlink_metadata(&candidate) {
                    Ok(meta) if meta.file_type().is_symlink() => {
                        follows += 1;
                        if follows > MAX_SYMLINK_FOLLOWS {
                            return SymlinkLoopSnafu { raw }.fail();
                        }
                        let target = fs::read_link(&candidate).context(CanonicalizeSnafu { raw })?;
                        // Relative targets are taken from the link's directory,
                        // which is `resolved` as it stands.
                        push_steps(&mut pending, &target);
                    }
                    Ok(_) => resolved = candidate,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => resolved = candidate,
                    Err(source) => {
                        return Err(SandboxError::Canonicalize {
                            source,
                            raw: raw.to_string(),
                        });
                    }
                }
            }
        }
    }

    Ok(resolved)
}
