//! Command descriptors.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Everything needed to launch one external command.
///
/// Environment overrides are `KEY=value` strings. When the command is
/// launched they come first, followed by every inherited variable whose key
/// is not overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandDescriptor {
    name: String,
    args: Vec<String>,
    dir: Option<PathBuf>,
    env: Vec<String>,
}

impl CommandDescriptor {
    /// Creates a descriptor for `name` with no arguments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Splits a command line on whitespace: the first word is the executable,
    /// the rest are arguments. An empty line yields an empty executable name.
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace().map(String::from);
        let name = words.next().unwrap_or_default();
        Self::new(name).with_args(words)
    }

    /// Appends one argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Adds a `KEY=value` environment override.
    pub fn with_env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Adds several `KEY=value` environment overrides.
    pub fn with_envs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Executable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Arguments, in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Explicit working directory, if one was set.
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Environment overrides as given.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Directory the command runs in: the explicit one or the caller's cwd.
    pub fn working_dir(&self) -> io::Result<PathBuf> {
        match &self.dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }

    /// Full environment for the child, resolved against this process's
    /// environment.
    pub fn resolve_env(&self) -> Vec<(OsString, OsString)> {
        resolve_env(&self.env, std::env::vars_os())
    }
}

impl fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Merge `overrides` with `inherited`.
///
/// Overrides come first, in order. Inherited variables follow unchanged,
/// except those whose key appears in the overrides. An override without `=`
/// sets the variable to the empty string.
pub fn resolve_env<I>(overrides: &[String], inherited: I) -> Vec<(OsString, OsString)>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut resolved: Vec<(OsString, OsString)> = overrides
        .iter()
        .map(|entry| {
            let (key, value) = entry.split_once('=').unwrap_or((entry.as_str(), ""));
            (OsString::from(key), OsString::from(value))
        })
        .collect();

    let overridden: HashSet<OsString> = resolved.iter().map(|(key, _)| key.clone()).collect();

    resolved.extend(
        inherited
            .into_iter()
            .filter(|(key, _)| !overridden.contains(key.as_os_str())),
    );
    resolved
}

/// Looks up `key` in a resolved environment.
pub fn env_value<'a>(env: &'a [(OsString, OsString)], key: &str) -> Option<&'a OsStr> {
    env.iter()
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.as_os_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(entries: &[(&str, &str)]) -> Vec<(OsString, OsString)> {
        entries
            .iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }

    #[test]
    fn test_parse_command_line() {
        let command = CommandDescriptor::parse("go  run   main.go");
        assert_eq!(command.name(), "go");
        assert_eq!(command.args(), ["run", "main.go"]);
    }

    #[test]
    fn test_parse_empty_line() {
        let command = CommandDescriptor::parse("   ");
        assert!(command.name().is_empty());
        assert!(command.args().is_empty());
    }

    #[test]
    fn test_display() {
        let command = CommandDescriptor::new("go").with_args(["test", "./..."]);
        assert_eq!(command.to_string(), "go test ./...");
    }

    #[test]
    fn test_override_replaces_inherited_once() {
        let inherited = pairs(&[("GOPATH", "/a"), ("HOME", "/home/dev")]);
        let env = resolve_env(&["GOPATH=/b".to_string()], inherited);

        let gopaths: Vec<_> = env.iter().filter(|(k, _)| k == "GOPATH").collect();
        assert_eq!(gopaths.len(), 1);
        assert_eq!(env_value(&env, "GOPATH"), Some(OsStr::new("/b")));
        assert_eq!(env_value(&env, "HOME"), Some(OsStr::new("/home/dev")));
    }

    #[test]
    fn test_overrides_come_first() {
        let inherited = pairs(&[("PATH", "/usr/bin")]);
        let env = resolve_env(&["GOBIN=/x/bin".to_string()], inherited);

        assert_eq!(env[0].0, OsString::from("GOBIN"));
        assert_eq!(env[1].0, OsString::from("PATH"));
    }

    #[test]
    fn test_key_match_is_exact() {
        // GOPATH must not shadow GOPATHS.
        let inherited = pairs(&[("GOPATHS", "/keep")]);
        let env = resolve_env(&["GOPATH=/b".to_string()], inherited);

        assert_eq!(env_value(&env, "GOPATHS"), Some(OsStr::new("/keep")));
    }

    #[test]
    fn test_override_without_value() {
        let env = resolve_env(&["EMPTY".to_string()], Vec::new());
        assert_eq!(env_value(&env, "EMPTY"), Some(OsStr::new("")));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let env = resolve_env(&["FLAGS=-X main.v=1".to_string()], Vec::new());
        assert_eq!(env_value(&env, "FLAGS"), Some(OsStr::new("-X main.v=1")));
    }

    #[test]
    fn test_working_dir_defaults_to_cwd() {
        let command = CommandDescriptor::new("pwd");
        assert_eq!(
            command.working_dir().unwrap(),
            std::env::current_dir().unwrap()
        );

        let command = command.with_dir("/");
        assert_eq!(command.working_dir().unwrap(), PathBuf::from("/"));
    }
}
