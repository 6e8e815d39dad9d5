//! Target records extracted from generated CMake elements.

use anyhow::Result;

use crate::cmake::artifacts::{BuildArtifact, CMakeArtifactsLocator};
use crate::cmake::backend::{CMakeCommand, CMakeCustomCommand, CMakeCustomTarget, CMakeElement};
use crate::cmake::generator::{CMakeGenerator, GeneratorSetup};
use crate::core::targets::{Target, TargetType, TargetsData};

/// Describe every target-like element, in file order.
pub fn collect_targets<'a>(elements: impl IntoIterator<Item = &'a CMakeElement>) -> TargetsData {
    let targets = elements.into_iter().filter_map(target_of).collect();
    TargetsData { targets }
}

fn target_of(element: &CMakeElement) -> Option<Target> {
    match element {
        CMakeElement::CustomTarget(target) => Some(Target {
            name: target.name.clone(),
            description: Some(target.description.clone()),
            depends: target.depends.clone(),
            outputs: target.byproducts.iter().map(|b| b.to_string()).collect(),
            target_type: TargetType::CustomTarget,
        }),
        // Named after the first output, attached commands after their target.
        CMakeElement::CustomCommand(command) => {
            let name = match command.build_event {
                Some((ref target, _)) => target.clone(),
                None => command
                    .outputs
                    .first()?
                    .to_path()
                    .file_name()?
                    .to_string_lossy()
                    .into_owned(),
            };
            Some(Target {
                name,
                description: Some(command.description.clone()),
                depends: command.depends.clone(),
                outputs: command.output_names(),
                target_type: TargetType::CustomCommand,
            })
        }
        CMakeElement::Executable(exe) => Some(Target {
            name: exe.name.clone(),
            description: None,
            depends: exe.libraries.clone(),
            outputs: vec![exe.name.clone()],
            target_type: TargetType::Executable,
        }),
        CMakeElement::Library(lib) => Some(Target {
            name: lib.target_name(),
            description: None,
            depends: Vec::new(),
            outputs: Vec::new(),
            target_type: TargetType::ObjectLibrary,
        }),
        _ => None,
    }
}

pub fn targets_data_generator<'a>(
    setup: GeneratorSetup<'a>,
) -> Result<Box<dyn CMakeGenerator + 'a>> {
    Ok(Box::new(TargetsDataCMakeGenerator {
        locator: setup.artifacts_locator(),
    }))
}

/// Adds a `targets_data` target rendering the targets documentation.
pub struct TargetsDataCMakeGenerator {
    locator: CMakeArtifactsLocator,
}

impl TargetsDataCMakeGenerator {
    pub fn new(locator: CMakeArtifactsLocator) -> Self {
        TargetsDataCMakeGenerator { locator }
    }
}

impl CMakeGenerator for TargetsDataCMakeGenerator {
    fn generate(&self) -> Result<Vec<CMakeElement>> {
        let json = self.locator.build_artifact(BuildArtifact::TargetsData);
        let doc = self.locator.cmake_build_dir.join("targets_data.md");
        let command = CMakeCustomCommand::new(
            "Generate variant targets documentation",
            vec![doc.clone()],
            vec![json.to_string()],
            vec![CMakeCommand::new(
                "yanga",
                [
                    "targets-doc".to_string(),
                    "--targets-data-file".to_string(),
                    json.to_string(),
                    "--output-file".to_string(),
                    doc.to_string(),
                ],
            )],
        );
        let outputs = command.output_names();
        Ok(vec![
            CMakeElement::CustomCommand(command),
            CMakeElement::CustomTarget(CMakeCustomTarget::new(
                "targets_data",
                "Generate targets data documentation",
                vec![],
                outputs,
                false,
            )),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmake::backend::{CMakeAddExecutable, CMakeLibrary, CMakePath};
    use crate::core::artifacts::ProjectArtifactsLocator;
    use crate::core::targets::TargetGraph;
    use std::path::Path;

    #[test]
    fn test_collect_targets() {
        let build = CMakePath::with_variable("/b", "CMAKE_BUILD_DIR");
        let lib = CMakeLibrary::object("CompA_PC", vec!["a.c".into()]);
        let mut exe = CMakeAddExecutable::new("CompA", vec!["test.cc".into()]);
        exe.libraries = vec![lib.target_name()];
        let junit = build.join("CompA/CompA_junit.xml");

        let elements = vec![
            CMakeElement::Comment("ignored".into()),
            CMakeElement::Library(lib),
            CMakeElement::Executable(exe),
            CMakeElement::CustomCommand(CMakeCustomCommand::new(
                "Run tests",
                vec![junit.clone()],
                vec!["CompA".into()],
                vec![],
            )),
            CMakeElement::CustomTarget(CMakeCustomTarget::new(
                "CompA_test",
                "Execute tests for CompA",
                vec![],
                vec![junit.to_string()],
                true,
            )),
        ];

        let data = collect_targets(&elements);
        let names: Vec<_> = data.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["CompA_PC_lib", "CompA", "CompA_junit.xml", "CompA_test"]);
        assert_eq!(data.targets[2].target_type, TargetType::CustomCommand);

        let graph = TargetGraph::new(&data);
        let tree = graph.tree("CompA_test").unwrap();
        assert_eq!(tree.children[0].name, "CompA_junit.xml");
        assert_eq!(tree.children[0].children[0].name, "CompA");
    }

    #[test]
    fn test_generator_target() {
        let project = ProjectArtifactsLocator::new(Path::new("/p"), None, None);
        let locator = CMakeArtifactsLocator::new(&project.variant_build_dir.clone(), project);
        let elements = TargetsDataCMakeGenerator::new(locator).generate().unwrap();

        assert_eq!(
            elements[1].to_string(),
            "# Generate targets data documentation\nadd_custom_target(targets_data\n    DEPENDS ${CMAKE_BUILD_DIR}/targets_data.md\n)"
        );
        assert!(elements[0].to_string().contains(
            "COMMAND yanga targets-doc --targets-data-file ${CMAKE_BUILD_DIR}/targets_data.json"
        ));
    }
}
