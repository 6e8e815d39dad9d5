//! GoogleTest executables, mockups and coverage per component.
//!
//! For every component:
//! - `<c>_PC_lib` object library with the productive sources
//! - `<c>` test executable linking GoogleTest and the object library
//! - `<c>_test`/`<c>_build` running the tests into a JUnit report
//! - `<c>_coverage` gcovr report
//! - `<c>_mockup` mock sources generated from the partially linked
//!   productive objects (when mocking is enabled)

use anyhow::Result;
use serde::Deserialize;

use crate::cmake::artifacts::{BuildArtifact, CMakeArtifactsLocator};
use crate::cmake::backend::{
    CMakeAddExecutable, CMakeCommand, CMakeCustomCommand, CMakeCustomTarget, CMakeElement,
    CMakeLibrary, CMakePath, CMakeVariable,
};
use crate::cmake::generator::{CMakeGenerator, GeneratorSetup};
use crate::core::component::{collect_source_directories, Component};
use crate::core::config::MockingConfig;
use crate::pipeline::context::{ExecutionContext, UserRequest, UserRequestTarget};
use crate::util::fs::to_posix;

/// Settings from the generator's `config` block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GTestCMakeGeneratorConfig {
    /// Define all includes globally instead of per component
    pub use_global_includes: bool,
    pub mocking: Option<MockingConfig>,
}

impl GTestCMakeGeneratorConfig {
    /// Mocks are generated unless explicitly disabled.
    pub fn automock(&self) -> bool {
        self.mocking.as_ref().and_then(|m| m.enabled).unwrap_or(true)
    }

    /// Overlay the component's own mocking settings.
    pub fn for_component(&self, component: &Component) -> GTestCMakeGeneratorConfig {
        let mut result = self.clone();
        let Some(ref own) = component.testing.mocking else {
            return result;
        };
        match result.mocking {
            None => result.mocking = Some(own.clone()),
            Some(ref mut mocking) => {
                if own.enabled.is_some() {
                    mocking.enabled = own.enabled;
                }
                if own.strict.is_some() {
                    mocking.strict = own.strict;
                }
                if !own.exclude_symbol_patterns.is_empty() {
                    mocking.exclude_symbol_patterns = own.exclude_symbol_patterns.clone();
                }
            }
        }
        result
    }
}

pub fn gtest_generator<'a>(setup: GeneratorSetup<'a>) -> Result<Box<dyn CMakeGenerator + 'a>> {
    let config = setup.parse_config()?;
    let locator = setup.artifacts_locator();
    Ok(Box::new(GTestCMakeGenerator::new(setup.context, locator, config)))
}

pub struct GTestCMakeGenerator<'a> {
    ctx: &'a ExecutionContext,
    locator: CMakeArtifactsLocator,
    config: GTestCMakeGeneratorConfig,
}

impl<'a> GTestCMakeGenerator<'a> {
    pub fn new(
        ctx: &'a ExecutionContext,
        locator: CMakeArtifactsLocator,
        config: GTestCMakeGeneratorConfig,
    ) -> Self {
        GTestCMakeGenerator { ctx, locator, config }
    }

    fn integration_elements(&self, gtest_dir: &CMakePath) -> Vec<CMakeElement> {
        let mut elements = vec![
            CMakeElement::Variable(CMakeVariable::new("CMAKE_CXX_STANDARD", "14")),
            CMakeElement::Variable(CMakeVariable::new("CMAKE_CXX_STANDARD_REQUIRED", "ON")),
            CMakeElement::Variable(CMakeVariable::cached(
                "gtest_force_shared_crt",
                "ON",
                "BOOL",
                "",
                true,
            )),
            CMakeElement::Comment("Add local GoogleTest directory".to_string()),
            CMakeElement::AddSubdirectory {
                source_dir: gtest_dir.clone(),
                build_dir: Some(self.locator.cmake_build_dir.join(".gtest")),
            },
        ];
        if self.config.use_global_includes {
            elements.push(self.global_include_directories(gtest_dir));
        } else {
            elements.push(CMakeElement::Comment(
                "Use global includes for all components disabled.".to_string(),
            ));
        }
        elements
    }

    fn global_include_directories(&self, gtest_dir: &CMakePath) -> CMakeElement {
        let components = &self.ctx.components;
        let mut paths: Vec<CMakePath> = Vec::new();
        let dirs = components
            .iter()
            .flat_map(|c| c.include_dirs.iter().cloned())
            .chain(collect_source_directories(components))
            .chain(self.ctx.include_directories())
            .map(CMakePath::new)
            .chain(["googletest/include", "googlemock/include"].iter().map(|d| gtest_dir.join(d)))
            .chain(components.iter().map(|c| self.locator.component_build_dir(&c.name)));
        for dir in dirs {
            if !paths.contains(&dir) {
                paths.push(dir);
            }
        }
        CMakeElement::IncludeDirectories(paths)
    }

    /// Component build dir (for generated mockups) plus the resolved
    /// include directories of the component.
    fn component_include_directories(&self, component: &Component) -> Vec<CMakePath> {
        let mut paths = vec![self.locator.component_build_dir(&component.name)];
        let dirs = component
            .include_dirs
            .iter()
            .cloned()
            .chain(collect_source_directories(std::slice::from_ref(component)))
            .chain(self.ctx.include_directories())
            .map(CMakePath::new);
        for dir in dirs {
            if !paths.contains(&dir) {
                paths.push(dir);
            }
        }
        paths
    }

    fn component_elements(&self, component: &Component) -> Vec<CMakeElement> {
        let name = &component.name;
        let config = self.config.for_component(component);
        let component_build_dir = self.locator.component_build_dir(name);
        let mut elements = vec![CMakeElement::Comment(format!("Component {}", name))];

        let productive_sources = component.source_paths();
        let object_library =
            CMakeLibrary::object(format!("{}_PC", name), productive_sources.clone())
                .with_compile_options(["-ggdb", "--coverage"]);
        elements.push(CMakeElement::Library(object_library.clone()));

        let include_dirs = self.component_include_directories(component);
        let per_component_includes = !config.use_global_includes;
        if per_component_includes {
            elements.push(CMakeElement::TargetIncludeDirectories {
                target: object_library.target_name(),
                paths: include_dirs.clone(),
                visibility: visibility(productive_sources.is_empty()),
            });
        }

        let mockup = config.automock().then(|| MockupCreator {
            component,
            object_library_target: object_library.target_name(),
            locator: &self.locator,
            mocking: config.mocking.as_ref(),
        });

        if !component.is_testable() {
            elements.push(CMakeElement::Comment(format!(
                "Component {} is not testable, only compiling sources.",
                name
            )));
            elements.push(CMakeElement::EmptyLine);
            return elements;
        }

        let mut sources: Vec<String> = component
            .test_source_paths()
            .iter()
            .map(|p| to_posix(p))
            .collect();
        if let Some(ref mockup) = mockup {
            sources.push(mockup.mockup_file("cc").to_string());
        }
        let mut executable = CMakeAddExecutable::new(name.clone(), sources);
        executable.libraries = vec![
            "GTest::gtest_main".into(),
            "GTest::gmock_main".into(),
            "pthread".into(),
            object_library.target_name(),
        ];
        executable.compile_options = vec!["-ggdb".into()];
        executable.link_options = vec!["--coverage".into()];
        let has_test_sources = !executable.sources.is_empty();
        elements.push(CMakeElement::Executable(executable));
        elements.push(CMakeElement::SetTargetProperties {
            target: name.clone(),
            properties: vec![("RUNTIME_OUTPUT_DIRECTORY".into(), component_build_dir.to_string())],
        });
        if per_component_includes {
            elements.push(CMakeElement::TargetIncludeDirectories {
                target: name.clone(),
                paths: include_dirs,
                visibility: visibility(!has_test_sources),
            });
        }

        let run_tests = self.run_executable(name);
        let coverage = self.coverage_report(component, &run_tests);
        let junit_outputs = run_tests.output_names();
        let coverage_outputs = coverage.output_names();
        elements.push(CMakeElement::CustomCommand(run_tests));
        elements.push(CMakeElement::CustomCommand(coverage));
        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            UserRequest::component_target_name(name, UserRequestTarget::Coverage),
            format!("Generate coverage report for {}", name),
            vec![],
            coverage_outputs,
            false,
        )));

        if let Some(mockup) = mockup {
            elements.extend(mockup.generate());
        }

        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            UserRequest::component_target_name(name, UserRequestTarget::Test),
            format!("Execute tests for {}", name),
            vec![],
            junit_outputs.clone(),
            true,
        )));
        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            UserRequest::component_target_name(name, UserRequestTarget::Build),
            format!("Execute tests for {}", name),
            vec![],
            junit_outputs,
            true,
        )));
        elements.push(CMakeElement::EmptyLine);
        elements
    }

    /// Run the tests into a JUnit report; failing tests do not fail the build.
    fn run_executable(&self, name: &str) -> CMakeCustomCommand {
        let component_build_dir = self.locator.component_build_dir(name);
        let junit = component_build_dir.join(format!("{}_junit.xml", name));
        let command = CMakeCommand::new(
            component_build_dir.join(name),
            [
                format!("--gtest_output=xml:{}", junit),
                "||".to_string(),
                "${CMAKE_COMMAND}".to_string(),
                "-E".to_string(),
                "true".to_string(),
            ],
        );
        CMakeCustomCommand::new(
            "Run the test executable, generate JUnit report and return success independent of the test result",
            vec![junit],
            vec![name.to_string()],
            vec![command],
        )
    }

    fn coverage_report(
        &self,
        component: &Component,
        run_tests: &CMakeCustomCommand,
    ) -> CMakeCustomCommand {
        let name = &component.name;
        let root = to_posix(self.locator.project_root_dir());
        let json = self.locator.component_build_artifact(name, BuildArtifact::CoverageJson);
        let html = self.locator.component_build_artifact(name, BuildArtifact::CoverageHtml);

        let mut json_args = vec!["--root".to_string(), root.clone()];
        for source in component.source_paths() {
            json_args.push("--filter".to_string());
            json_args.push(to_posix(&source));
        }
        json_args.extend([
            "--json".to_string(),
            "--output".to_string(),
            json.to_string(),
            "--json-pretty".to_string(),
            self.locator.component_build_dir(name).to_string(),
        ]);

        CMakeCustomCommand::new(
            format!("Generate coverage report for component {}", name),
            vec![json.clone(), html.clone()],
            run_tests.output_names(),
            vec![
                CMakeCommand::new("gcovr", json_args),
                CMakeCommand::new(
                    "${CMAKE_COMMAND}",
                    [
                        "-E".to_string(),
                        "make_directory".to_string(),
                        self.locator.component_build_dir(name).join("coverage").to_string(),
                    ],
                ),
                CMakeCommand::new(
                    "gcovr",
                    [
                        "--root".to_string(),
                        root,
                        "--add-tracefile".to_string(),
                        json.to_string(),
                        "--html".to_string(),
                        "--html-details".to_string(),
                        "--output".to_string(),
                        html.to_string(),
                    ],
                ),
            ],
        )
    }

    fn variant_elements(&self) -> Vec<CMakeElement> {
        let reports: Vec<CMakePath> = self
            .ctx
            .components
            .iter()
            .filter(|c| c.is_testable())
            .map(|c| self.locator.component_build_artifact(&c.name, BuildArtifact::CoverageJson))
            .collect();
        let html = self.locator.build_artifact(BuildArtifact::CoverageHtml);

        let mut args = vec!["--root".to_string(), to_posix(self.locator.project_root_dir())];
        for report in &reports {
            args.push("--add-tracefile".to_string());
            args.push(report.to_string());
        }
        args.extend([
            "--html".to_string(),
            "--html-details".to_string(),
            "--output".to_string(),
            html.to_string(),
        ]);

        let command = CMakeCustomCommand::new(
            "Generate coverage report for the variant",
            vec![html.clone()],
            reports.iter().map(|r| r.to_string()).collect(),
            vec![
                CMakeCommand::new(
                    "${CMAKE_COMMAND}",
                    [
                        "-E".to_string(),
                        "make_directory".to_string(),
                        self.locator.cmake_build_dir.join("coverage").to_string(),
                    ],
                ),
                CMakeCommand::new("gcovr", args),
            ],
        );
        let outputs = command.output_names();
        vec![
            CMakeElement::CustomCommand(command),
            CMakeElement::CustomTarget(CMakeCustomTarget::new(
                UserRequestTarget::Coverage.as_str(),
                "Generate variant coverage report",
                vec![],
                outputs,
                false,
            )),
        ]
    }
}

impl CMakeGenerator for GTestCMakeGenerator<'_> {
    fn generate(&self) -> Result<Vec<CMakeElement>> {
        let gtest_dir = CMakePath::new(self.locator.gtest_dir()?);
        let mut elements = vec![CMakeElement::Comment(
            "Generated by GTestCMakeGenerator".to_string(),
        )];
        elements.extend(self.integration_elements(&gtest_dir));
        for component in &self.ctx.components {
            elements.extend(self.component_elements(component));
        }
        elements.extend(self.variant_elements());
        Ok(elements)
    }
}

fn visibility(interface_only: bool) -> String {
    if interface_only { "INTERFACE" } else { "PRIVATE" }.to_string()
}

/// Generates mock sources for the symbols a component uses but does not define.
struct MockupCreator<'a> {
    component: &'a Component,
    object_library_target: String,
    locator: &'a CMakeArtifactsLocator,
    mocking: Option<&'a MockingConfig>,
}

impl MockupCreator<'_> {
    fn mockup_file(&self, extension: &str) -> CMakePath {
        self.locator
            .component_build_dir(&self.component.name)
            .join(format!("mockup_{}.{}", self.component.name, extension))
    }

    fn generate(&self) -> Vec<CMakeElement> {
        let name = &self.component.name;
        let component_build_dir = self.locator.component_build_dir(name);
        let partial_link_obj = component_build_dir.join(format!("{}_PC.o", name));

        let partial_link = CMakeCustomCommand::new(
            "Create partial link library containing only the productive sources",
            vec![partial_link_obj.clone()],
            vec![self.object_library_target.clone()],
            vec![CMakeCommand::new(
                "${CMAKE_CXX_COMPILER}",
                [
                    "-r".to_string(),
                    "-nostdlib".to_string(),
                    "-o".to_string(),
                    partial_link_obj.to_string(),
                    format!("$<TARGET_OBJECTS:{}>", self.object_library_target),
                ],
            )],
        );

        let mut args = vec![
            "mock".to_string(),
            "--filename".to_string(),
            format!("mockup_{}", name),
        ];
        args.extend(
            self.component
                .source_paths()
                .iter()
                .map(|s| format!("--source-file {}", to_posix(s))),
        );
        args.extend([
            "--partial-object-file".to_string(),
            partial_link_obj.to_string(),
            "--output-dir".to_string(),
            component_build_dir.to_string(),
            "--compilation-database".to_string(),
            self.locator
                .build_artifact(BuildArtifact::CompileCommands)
                .to_string(),
        ]);
        if let Some(mocking) = self.mocking {
            let strict = mocking.strict.unwrap_or(false);
            args.push(if strict { "--strict" } else { "--no-strict" }.to_string());
            for pattern in &mocking.exclude_symbol_patterns {
                args.push("--exclude-symbol-pattern".to_string());
                args.push(format!("\"{}\"", pattern));
            }
        }

        let outputs: Vec<CMakePath> =
            ["log", "h", "cc"].iter().map(|e| self.mockup_file(e)).collect();
        let generate_mockup = CMakeCustomCommand::new(
            "Run clanguru to generate mockup sources",
            outputs,
            vec![partial_link_obj.to_string()],
            vec![CMakeCommand::new("clanguru", args)],
        );
        let mockup_outputs = generate_mockup.output_names();

        vec![
            CMakeElement::CustomCommand(partial_link),
            CMakeElement::CustomCommand(generate_mockup),
            CMakeElement::CustomTarget(CMakeCustomTarget::new(
                UserRequest::component_target_name(name, UserRequestTarget::Mockup),
                format!("Generate mockup sources for {}", name),
                vec![],
                mockup_outputs,
                false,
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifacts::ProjectArtifactsLocator;
    use tempfile::TempDir;

    fn setup(tmp: &TempDir) -> ExecutionContext {
        std::fs::create_dir_all(tmp.path().join("build/gtest")).unwrap();

        let mut comp_a = Component::new("CompA", tmp.path().join("src/CompA"));
        comp_a.sources = vec!["CompA.c".into()];
        comp_a.test_sources = vec!["test_CompA.cc".into()];
        let mut comp_b = Component::new("CompBNotTestable", tmp.path().join("src/CompB"));
        comp_b.sources = vec!["CompB.c".into()];

        ExecutionContext::new(tmp.path(), UserRequest::variant(Some("Blue".into()), None))
            .with_components(vec![comp_a, comp_b])
    }

    fn generator<'a>(
        ctx: &'a ExecutionContext,
        config: GTestCMakeGeneratorConfig,
    ) -> GTestCMakeGenerator<'a> {
        let project =
            ProjectArtifactsLocator::new(&ctx.project_root_dir, ctx.variant_name.as_deref(), None);
        let locator = CMakeArtifactsLocator::new(&project.variant_build_dir.clone(), project);
        GTestCMakeGenerator::new(ctx, locator, config)
    }

    fn rendered(elements: &[CMakeElement]) -> String {
        elements
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn target_names(elements: &[CMakeElement]) -> Vec<String> {
        elements
            .iter()
            .filter_map(|e| match e {
                CMakeElement::CustomTarget(t) => Some(t.name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_component_targets() {
        let tmp = TempDir::new().unwrap();
        let ctx = setup(&tmp);
        let elements = generator(&ctx, GTestCMakeGeneratorConfig::default()).generate().unwrap();

        assert_eq!(
            target_names(&elements),
            vec!["CompA_coverage", "CompA_mockup", "CompA_test", "CompA_build", "coverage"]
        );

        let text = rendered(&elements);
        assert!(text.contains("set(gtest_force_shared_crt ON CACHE BOOL \"\" FORCE)"));
        assert!(text.contains("add_subdirectory("));
        assert!(text.contains("${CMAKE_BUILD_DIR}/.gtest)"));
        assert!(text.contains("add_library(CompA_PC_lib OBJECT"));
        assert!(text.contains("target_compile_options(CompA_PC_lib PRIVATE -ggdb --coverage)"));
        assert!(text.contains(
            "target_link_libraries(CompA GTest::gtest_main GTest::gmock_main pthread CompA_PC_lib)"
        ));
        assert!(text.contains("${CMAKE_BUILD_DIR}/CompA/mockup_CompA.cc"));
        assert!(text.contains(
            "COMMAND ${CMAKE_BUILD_DIR}/CompA/CompA --gtest_output=xml:${CMAKE_BUILD_DIR}/CompA/CompA_junit.xml || ${CMAKE_COMMAND} -E true"
        ));
        assert!(text.contains(
            "# Component CompBNotTestable is not testable, only compiling sources."
        ));
        assert!(text.contains("add_library(CompBNotTestable_PC_lib OBJECT"));
    }

    #[test]
    fn test_component_disables_mocking() {
        let tmp = TempDir::new().unwrap();
        let mut ctx = setup(&tmp);
        ctx.components[0].testing.mocking = Some(MockingConfig {
            enabled: Some(false),
            ..Default::default()
        });

        let elements = generator(&ctx, GTestCMakeGeneratorConfig::default()).generate().unwrap();
        assert!(!target_names(&elements).contains(&"CompA_mockup".to_string()));
        assert!(!rendered(&elements).contains("mockup_CompA.cc"));
    }

    #[test]
    fn test_mocking_flags() {
        let tmp = TempDir::new().unwrap();
        let ctx = setup(&tmp);
        let config = GTestCMakeGeneratorConfig {
            use_global_includes: true,
            mocking: Some(MockingConfig {
                enabled: None,
                strict: Some(true),
                exclude_symbol_patterns: vec!["__*".into()],
            }),
        };

        let text = rendered(&generator(&ctx, config).generate().unwrap());
        assert!(text.contains("--strict --exclude-symbol-pattern \"__*\""));
        assert!(text.contains("include_directories("));
        assert!(!text.contains("target_include_directories"));
    }

    #[test]
    fn test_component_overrides_patterns() {
        let global = GTestCMakeGeneratorConfig {
            use_global_includes: false,
            mocking: Some(MockingConfig {
                enabled: Some(true),
                strict: None,
                exclude_symbol_patterns: vec!["a*".into()],
            }),
        };
        let mut component = Component::new("c", "/p/c");
        component.testing.mocking = Some(MockingConfig {
            enabled: None,
            strict: None,
            exclude_symbol_patterns: vec!["b*".into()],
        });

        let merged = global.for_component(&component);
        assert!(merged.automock());
        assert_eq!(merged.mocking.unwrap().exclude_symbol_patterns, vec!["b*"]);
    }

    #[test]
    fn test_missing_gtest_dir_fails() {
        let tmp = TempDir::new().unwrap();
        let ctx = ExecutionContext::new(tmp.path(), UserRequest::variant(None, None));
        assert!(generator(&ctx, GTestCMakeGeneratorConfig::default()).generate().is_err());
    }
}
