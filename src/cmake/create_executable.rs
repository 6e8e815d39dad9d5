//! Variant executable built from all component object libraries.

use std::path::PathBuf;

use anyhow::Result;

use crate::cmake::backend::{
    CMakeAddExecutable, CMakeCustomTarget, CMakeElement, CMakeLibrary, CMakePath,
};
use crate::cmake::generator::{CMakeGenerator, GeneratorSetup};
use crate::core::component::{collect_source_directories, Component};
use crate::pipeline::context::ExecutionContext;

pub const EXECUTABLE_NAME: &str = "${PROJECT_NAME}";

pub fn create_executable_generator<'a>(
    setup: GeneratorSetup<'a>,
) -> Result<Box<dyn CMakeGenerator + 'a>> {
    Ok(Box::new(CreateExecutableCMakeGenerator { ctx: setup.context }))
}

/// Compiles every component into an object library and links them into
/// one executable named after the CMake project.
pub struct CreateExecutableCMakeGenerator<'a> {
    ctx: &'a ExecutionContext,
}

impl<'a> CreateExecutableCMakeGenerator<'a> {
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        CreateExecutableCMakeGenerator { ctx }
    }

    fn include_directories(&self) -> Vec<PathBuf> {
        let components = &self.ctx.components;
        let mut dirs: Vec<PathBuf> = Vec::new();
        let all = components
            .iter()
            .flat_map(|c| c.include_dirs.iter().cloned())
            .chain(collect_source_directories(components))
            .chain(self.ctx.include_directories());
        for dir in all {
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs
    }

    fn component_elements(component: &Component) -> (Vec<CMakeElement>, Option<CMakeLibrary>) {
        let name = &component.name;
        let mut elements = vec![CMakeElement::Comment(format!("Component {}", name))];

        let library = if component.sources.is_empty() {
            None
        } else {
            Some(CMakeLibrary::object(name.clone(), component.source_paths()))
        };
        let compile_depends = match library {
            Some(ref lib) => {
                elements.push(CMakeElement::Library(lib.clone()));
                vec![lib.target_name()]
            }
            None => Vec::new(),
        };

        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            format!("{}_compile", name),
            format!("Compile component {}", name),
            vec![],
            compile_depends,
            false,
        )));
        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            format!("{}_build", name),
            format!("Build component {}", name),
            vec![],
            vec![format!("{}_compile", name)],
            false,
        )));
        (elements, library)
    }
}

impl CMakeGenerator for CreateExecutableCMakeGenerator<'_> {
    fn generate(&self) -> Result<Vec<CMakeElement>> {
        let mut elements = vec![CMakeElement::Comment(
            "Variant executable from all component sources".to_string(),
        )];

        let include_dirs = self.include_directories();
        if !include_dirs.is_empty() {
            elements.push(CMakeElement::IncludeDirectories(
                include_dirs.into_iter().map(CMakePath::new).collect(),
            ));
        }

        let mut libraries = Vec::new();
        for component in &self.ctx.components {
            let (component_elements, library) = Self::component_elements(component);
            elements.extend(component_elements);
            libraries.extend(library);
        }

        let mut build_depends = Vec::new();
        if !libraries.is_empty() {
            let exe = CMakeAddExecutable::new(
                EXECUTABLE_NAME,
                libraries.iter().map(|lib| lib.target_objects()).collect(),
            );
            elements.push(CMakeElement::Executable(exe));
            build_depends.push(EXECUTABLE_NAME.to_string());
        } else {
            tracing::warn!("No component sources found, the variant executable is not generated.");
        }

        elements.push(CMakeElement::CustomTarget(CMakeCustomTarget::new(
            "build",
            "Build variant executable",
            vec![],
            build_depends,
            false,
        )));
        Ok(elements)
    }
}
