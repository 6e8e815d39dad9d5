//! CMake object model.
//!
//! Every element renders to a fixed textual form. A [`CMakeFile`] is an
//! ordered list of elements; rendering concatenates them in insertion
//! order, nothing is sorted or reordered.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::util::fs::{to_posix, write_if_changed};

const TAB: &str = "    ";

/// A path, optionally expressed relative to a CMake variable.
///
/// `CMakePath::with_variable("/b", "CMAKE_BUILD_DIR").join("x")` renders
/// as `${CMAKE_BUILD_DIR}/x` while [`CMakePath::to_path`] gives `/b/x`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CMakePath {
    path: PathBuf,
    variable: Option<String>,
    relative_path: Option<PathBuf>,
}

impl CMakePath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CMakePath {
            path: path.into(),
            variable: None,
            relative_path: None,
        }
    }

    pub fn with_variable(path: impl Into<PathBuf>, variable: impl Into<String>) -> Self {
        CMakePath {
            path: path.into(),
            variable: Some(variable.into()),
            relative_path: None,
        }
    }

    pub fn variable(&self) -> Option<&str> {
        self.variable.as_deref()
    }

    /// `set(<variable> <path>)` for variable-backed paths.
    pub fn to_cmake_element(&self) -> Option<CMakeElement> {
        self.variable
            .as_ref()
            .map(|var| {
                CMakeElement::Variable(CMakeVariable::new(var.clone(), to_posix(&self.to_path())))
            })
    }

    /// The concrete filesystem path.
    pub fn to_path(&self) -> PathBuf {
        match self.relative_path {
            Some(ref rel) => self.path.join(rel),
            None => self.path.clone(),
        }
    }

    pub fn join(&self, path: impl AsRef<Path>) -> CMakePath {
        let relative_path = match self.relative_path {
            Some(ref rel) => rel.join(path),
            None => path.as_ref().to_path_buf(),
        };
        CMakePath {
            path: self.path.clone(),
            variable: self.variable.clone(),
            relative_path: Some(relative_path),
        }
    }
}

impl fmt::Display for CMakePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.variable {
            Some(ref var) => write!(f, "${{{}}}", var)?,
            None => f.write_str(&to_posix(&self.path))?,
        }
        if let Some(ref rel) = self.relative_path {
            write!(f, "/{}", to_posix(rel))?;
        }
        Ok(())
    }
}

impl From<&Path> for CMakePath {
    fn from(path: &Path) -> Self {
        CMakePath::new(path)
    }
}

impl From<PathBuf> for CMakePath {
    fn from(path: PathBuf) -> Self {
        CMakePath::new(path)
    }
}

/// `set(NAME VALUE [CACHE] [TYPE] ["DOC"] [FORCE])`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeVariable {
    pub name: String,
    pub value: String,
    pub cache: bool,
    pub var_type: Option<String>,
    pub docstring: Option<String>,
    pub force: bool,
}

impl CMakeVariable {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        CMakeVariable {
            name: name.into(),
            value: value.into(),
            cache: false,
            var_type: None,
            docstring: None,
            force: false,
        }
    }

    /// A cache entry, e.g. `set(X ON CACHE BOOL "" FORCE)`.
    pub fn cached(
        name: impl Into<String>,
        value: impl Into<String>,
        var_type: impl Into<String>,
        docstring: impl Into<String>,
        force: bool,
    ) -> Self {
        CMakeVariable {
            cache: true,
            var_type: Some(var_type.into()),
            docstring: Some(docstring.into()),
            force,
            ..CMakeVariable::new(name, value)
        }
    }

    fn render(&self) -> String {
        let mut args = vec![self.name.clone(), self.value.clone()];
        if self.cache {
            args.push("CACHE".to_string());
        }
        if let Some(ref t) = self.var_type {
            args.push(t.clone());
        }
        if let Some(ref doc) = self.docstring {
            args.push(format!("\"{}\"", doc));
        }
        if self.force {
            args.push("FORCE".to_string());
        }
        format!("set({})", args.join(" "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibraryType {
    Object,
    Static,
    Shared,
}

impl LibraryType {
    fn as_str(&self) -> &'static str {
        match self {
            LibraryType::Object => "OBJECT",
            LibraryType::Static => "STATIC",
            LibraryType::Shared => "SHARED",
        }
    }
}

/// `add_library(<name>_lib <TYPE> files...)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeLibrary {
    pub name: String,
    pub files: Vec<PathBuf>,
    pub library_type: LibraryType,
    pub compile_options: Vec<String>,
}

impl CMakeLibrary {
    pub fn object(name: impl Into<String>, files: Vec<PathBuf>) -> Self {
        CMakeLibrary {
            name: name.into(),
            files,
            library_type: LibraryType::Object,
            compile_options: Vec::new(),
        }
    }

    pub fn with_compile_options<S: Into<String>>(
        mut self,
        options: impl IntoIterator<Item = S>,
    ) -> Self {
        self.compile_options.extend(options.into_iter().map(Into::into));
        self
    }

    pub fn target_name(&self) -> String {
        format!("{}_lib", self.name)
    }

    /// Generator expression naming the library's object files.
    pub fn target_objects(&self) -> String {
        format!("$<TARGET_OBJECTS:{}>", self.target_name())
    }

    fn render(&self) -> String {
        let files: Vec<String> = self.files.iter().map(|f| to_posix(f)).collect();
        let mut content = format!(
            "add_library({} {} {})",
            self.target_name(),
            self.library_type.as_str(),
            files.join(" ")
        );
        if !self.compile_options.is_empty() {
            content.push_str(&format!(
                "\ntarget_compile_options({} PRIVATE {})",
                self.target_name(),
                self.compile_options.join(" ")
            ));
        }
        content
    }
}

/// `add_executable` plus optional link/compile/link-option statements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CMakeAddExecutable {
    pub name: String,
    pub sources: Vec<String>,
    pub libraries: Vec<String>,
    pub compile_options: Vec<String>,
    pub link_options: Vec<String>,
    pub exclude_from_all: bool,
}

impl CMakeAddExecutable {
    pub fn new(name: impl Into<String>, sources: Vec<String>) -> Self {
        CMakeAddExecutable {
            name: name.into(),
            sources,
            ..Default::default()
        }
    }

    fn render(&self) -> String {
        let mut args = vec![self.name.clone()];
        if self.exclude_from_all {
            args.push("EXCLUDE_FROM_ALL".to_string());
        }
        args.extend(self.sources.iter().cloned());
        let mut content = format!("add_executable({})", args.join(" "));
        if !self.libraries.is_empty() {
            content.push_str(&format!(
                "\ntarget_link_libraries({} {})",
                self.name,
                self.libraries.join(" ")
            ));
        }
        if !self.compile_options.is_empty() {
            content.push_str(&format!(
                "\ntarget_compile_options({} PRIVATE {})",
                self.name,
                self.compile_options.join(" ")
            ));
        }
        if !self.link_options.is_empty() {
            content.push_str(&format!(
                "\ntarget_link_options({} PRIVATE {})",
                self.name,
                self.link_options.join(" ")
            ));
        }
        content
    }
}

/// `COMMAND <command> args...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeCommand {
    pub command: String,
    pub arguments: Vec<String>,
}

impl CMakeCommand {
    pub fn new<S: ToString>(
        command: impl ToString,
        arguments: impl IntoIterator<Item = S>,
    ) -> Self {
        CMakeCommand {
            command: command.to_string(),
            arguments: arguments.into_iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl fmt::Display for CMakeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COMMAND {}", self.command)?;
        if !self.arguments.is_empty() {
            write!(f, " {}", self.arguments.join(" "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEvent {
    PreBuild,
    PreLink,
    PostBuild,
}

impl BuildEvent {
    fn as_str(&self) -> &'static str {
        match self {
            BuildEvent::PreBuild => "PRE_BUILD",
            BuildEvent::PreLink => "PRE_LINK",
            BuildEvent::PostBuild => "POST_BUILD",
        }
    }
}

/// A commented `add_custom_command(...)` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CMakeCustomCommand {
    pub description: String,
    pub outputs: Vec<CMakePath>,
    pub depends: Vec<String>,
    pub commands: Vec<CMakeCommand>,
    pub working_directory: Option<CMakePath>,
    pub byproducts: Vec<CMakePath>,
    /// Attach to a target instead of producing outputs
    pub build_event: Option<(String, BuildEvent)>,
}

impl CMakeCustomCommand {
    pub fn new(
        description: impl Into<String>,
        outputs: Vec<CMakePath>,
        depends: Vec<String>,
        commands: Vec<CMakeCommand>,
    ) -> Self {
        CMakeCustomCommand {
            description: description.into(),
            outputs,
            depends,
            commands,
            ..Default::default()
        }
    }

    /// Outputs rendered as dependency strings for other targets.
    pub fn output_names(&self) -> Vec<String> {
        self.outputs.iter().map(|o| o.to_string()).collect()
    }

    fn render(&self) -> String {
        let mut lines = vec![format!("# {}", self.description), "add_custom_command(".to_string()];
        match self.build_event {
            Some((ref target, event)) => {
                lines.push(format!("{}TARGET {} {}", TAB, target, event.as_str()))
            }
            None => lines.push(format!("{}OUTPUT {}", TAB, join_display(&self.outputs))),
        }
        if !self.depends.is_empty() {
            lines.push(format!("{}DEPENDS {}", TAB, self.depends.join(" ")));
        }
        lines.extend(self.commands.iter().map(|c| format!("{}{}", TAB, c)));
        if let Some(ref dir) = self.working_directory {
            lines.push(format!("{}WORKING_DIRECTORY {}", TAB, dir));
        }
        if !self.byproducts.is_empty() {
            lines.push(format!("{}BYPRODUCTS {}", TAB, join_display(&self.byproducts)));
        }
        lines.push(")".to_string());
        lines.join("\n")
    }
}

/// A commented `add_custom_target(...)` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CMakeCustomTarget {
    pub name: String,
    pub description: String,
    pub commands: Vec<CMakeCommand>,
    pub depends: Vec<String>,
    /// Add to the `all` target
    pub default_target: bool,
    pub byproducts: Vec<CMakePath>,
}

impl CMakeCustomTarget {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        commands: Vec<CMakeCommand>,
        depends: Vec<String>,
        default_target: bool,
    ) -> Self {
        CMakeCustomTarget {
            name: name.into(),
            description: description.into(),
            commands,
            depends,
            default_target,
            byproducts: Vec::new(),
        }
    }

    fn render(&self) -> String {
        let header = if self.default_target {
            format!("add_custom_target({} ALL", self.name)
        } else {
            format!("add_custom_target({}", self.name)
        };
        let mut lines = vec![format!("# {}", self.description), header];
        lines.extend(self.commands.iter().map(|c| format!("{}{}", TAB, c)));
        if !self.depends.is_empty() {
            lines.push(format!("{}DEPENDS {}", TAB, self.depends.join(" ")));
        }
        if !self.byproducts.is_empty() {
            lines.push(format!("{}BYPRODUCTS {}", TAB, join_display(&self.byproducts)));
        }
        lines.push(")".to_string());
        lines.join("\n")
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// One CMake statement or fixed block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CMakeElement {
    Content(String),
    EmptyLine,
    Comment(String),
    Project(String),
    MinimumVersion(String),
    Variable(CMakeVariable),
    Include(String),
    IncludeDirectories(Vec<CMakePath>),
    TargetIncludeDirectories {
        target: String,
        paths: Vec<CMakePath>,
        /// PRIVATE, PUBLIC or INTERFACE
        visibility: String,
    },
    Library(CMakeLibrary),
    Executable(CMakeAddExecutable),
    SetTargetProperties {
        target: String,
        properties: Vec<(String, String)>,
    },
    CustomCommand(CMakeCustomCommand),
    CustomTarget(CMakeCustomTarget),
    ExecuteProcess {
        description: String,
        commands: Vec<CMakeCommand>,
    },
    AddSubdirectory {
        source_dir: CMakePath,
        build_dir: Option<CMakePath>,
    },
    ListAppend {
        variable: String,
        values: Vec<String>,
    },
    EnableTesting,
}

impl fmt::Display for CMakeElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CMakeElement::Content(content) => f.write_str(content),
            CMakeElement::EmptyLine => Ok(()),
            CMakeElement::Comment(comment) => write!(f, "# {}", comment),
            CMakeElement::Project(name) => write!(f, "project({})", name),
            CMakeElement::MinimumVersion(version) => {
                write!(f, "cmake_minimum_required(VERSION {})", version)
            }
            CMakeElement::Variable(var) => f.write_str(&var.render()),
            CMakeElement::Include(path) => write!(f, "include({})", path),
            CMakeElement::IncludeDirectories(paths) => {
                writeln!(f, "include_directories(")?;
                for path in paths {
                    writeln!(f, "{}{}", TAB, path)?;
                }
                f.write_str(")")
            }
            CMakeElement::TargetIncludeDirectories {
                target,
                paths,
                visibility,
            } => {
                if paths.is_empty() {
                    return Ok(());
                }
                write!(
                    f,
                    "target_include_directories({} {} {})",
                    target,
                    visibility,
                    join_display(paths)
                )
            }
            CMakeElement::Library(lib) => f.write_str(&lib.render()),
            CMakeElement::Executable(exe) => f.write_str(&exe.render()),
            CMakeElement::SetTargetProperties { target, properties } => {
                if properties.is_empty() {
                    return Ok(());
                }
                let props: Vec<String> = properties
                    .iter()
                    .map(|(k, v)| format!("{} {}", k, v))
                    .collect();
                write!(f, "set_target_properties({} PROPERTIES {})", target, props.join(" "))
            }
            CMakeElement::CustomCommand(cmd) => f.write_str(&cmd.render()),
            CMakeElement::CustomTarget(target) => f.write_str(&target.render()),
            CMakeElement::ExecuteProcess { description, commands } => {
                writeln!(f, "# {}", description)?;
                writeln!(f, "execute_process(")?;
                for command in commands {
                    writeln!(f, "{}{}", TAB, command)?;
                }
                writeln!(f, "{}RESULT_VARIABLE result", TAB)?;
                writeln!(f, ")")?;
                writeln!(f, "if(result)")?;
                writeln!(f, "{}message(FATAL_ERROR '{} failed: ${{result}}')", TAB, description)?;
                f.write_str("endif()")
            }
            CMakeElement::AddSubdirectory { source_dir, build_dir } => match build_dir {
                Some(build_dir) => write!(f, "add_subdirectory({} {})", source_dir, build_dir),
                None => write!(f, "add_subdirectory({})", source_dir),
            },
            CMakeElement::ListAppend { variable, values } => {
                write!(f, "list(APPEND {} {})", variable, values.join(" "))
            }
            CMakeElement::EnableTesting => f.write_str("enable_testing()"),
        }
    }
}

/// A generated CMake file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CMakeFile {
    pub path: PathBuf,
    elements: Vec<CMakeElement>,
}

impl CMakeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CMakeFile {
            path: path.into(),
            elements: Vec::new(),
        }
    }

    pub fn append(&mut self, element: CMakeElement) {
        self.elements.push(element);
    }

    pub fn extend(&mut self, elements: impl IntoIterator<Item = CMakeElement>) {
        self.elements.extend(elements);
    }

    pub fn elements(&self) -> &[CMakeElement] {
        &self.elements
    }

    /// Write the file; untouched when the content did not change.
    pub fn to_file(&self) -> Result<bool> {
        write_if_changed(&self.path, &self.to_string())
    }
}

impl fmt::Display for CMakeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            writeln!(f, "{}", element)?;
        }
        Ok(())
    }
}
