use crate::backend::Backend;
use crate::device::DeviceError;
use crate::state::UniformStore;

/// Index of a declared shader. Callers pick the numbering.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderSlot(pub u16);

/// Inserts `#define NAME` into GLSL source, after the `#version` line if there is one.
pub fn with_define(source: &str, name: &str) -> String {
    let define = format!("#define {name}\n");
    if source.trim_start().starts_with("#version") {
        match source.find('\n') {
            Some(end) => {
                let (version, rest) = source.split_at(end + 1);
                format!("{version}{define}{rest}")
            }
            None => format!("{source}\n{define}"),
        }
    } else {
        format!("{define}{source}")
    }
}

#[derive(Debug)]
struct UniformBinding<U> {
    name: String,
    location: Option<U>,
    /// Version of the value last sent to this program.
    pushed: u64,
}

/// One program variant. Compiles on first use; a failure is kept and reported on
/// every later bind.
#[derive(Debug)]
pub struct ShaderProgram<B: Backend> {
    name: String,
    vertex: String,
    fragment: String,
    compiled: Option<Result<B::Program, String>>,
    bindings: Vec<Option<UniformBinding<B::Uniform>>>,
}

impl<B: Backend> ShaderProgram<B> {
    fn new(name: &str, vertex: &str, fragment: String) -> Self {
        Self {
            name: name.to_owned(),
            vertex: vertex.to_owned(),
            fragment,
            compiled: None,
            bindings: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.compiled, Some(Ok(_)))
    }

    /// Returns the backend program, compiling it on first call.
    pub fn program(&mut self, backend: &mut B) -> Result<B::Program, DeviceError> {
        let compiled = self.compiled.get_or_insert_with(|| {
            let result = backend.create_program(&self.name, &self.vertex, &self.fragment);
            match &result {
                Ok(_) => log::debug!("compiled shader {}", self.name),
                Err(log) => log::error!("shader {} failed to compile: {log}", self.name),
            }
            result
        });

        match compiled {
            Ok(program) => Ok(*program),
            Err(log) => Err(DeviceError::ShaderCompile {
                name: self.name.clone(),
                log: log.clone(),
            }),
        }
    }

    /// Pushes every uniform whose version differs from what this program last
    /// received. Returns the number of pushes.
    pub fn push_changed(&mut self, backend: &mut B, uniforms: &UniformStore) -> usize {
        let Some(Ok(program)) = self.compiled.as_ref() else {
            return 0;
        };
        let program = *program;

        if self.bindings.len() < uniforms.len() {
            self.bindings.resize_with(uniforms.len(), || None);
        }

        let mut pushed = 0;
        for (index, info) in uniforms.iter() {
            let slot = &mut self.bindings[index];
            if slot.as_ref().is_none_or(|b| b.name != info.name) {
                *slot = Some(UniformBinding {
                    name: info.name.clone(),
                    location: backend.uniform_location(program, &info.name),
                    pushed: 0,
                });
            }
            let Some(binding) = slot.as_mut() else {
                continue;
            };

            if binding.pushed == info.version {
                continue;
            }
            if let Some(location) = &binding.location {
                backend.set_uniform(location, info.kind, uniforms.values(info));
                pushed += 1;
            }
            binding.pushed = info.version;
        }
        pushed
    }

    fn release(&mut self, backend: &mut B) {
        if let Some(Ok(program)) = self.compiled.take() {
            backend.delete_program(program);
        }
        self.bindings.clear();
    }
}

/// Declared shaders. Each slot holds a normal and an alpha-test variant.
#[derive(Debug)]
pub struct ShaderManager<B: Backend> {
    slots: Vec<Option<[ShaderProgram<B>; 2]>>,
}

impl<B: Backend> Default for ShaderManager<B> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<B: Backend> ShaderManager<B> {
    pub fn declare(
        &mut self,
        backend: &mut B,
        slot: ShaderSlot,
        name: &str,
        vertex: &str,
        fragment: &str,
    ) {
        let index = usize::from(slot.0);
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }

        if let Some(old) = self.slots[index].as_mut() {
            for variant in old.iter_mut() {
                variant.release(backend);
            }
        }

        self.slots[index] = Some([
            ShaderProgram::new(name, vertex, fragment.to_owned()),
            ShaderProgram::new(name, vertex, with_define(fragment, "ALPHA_TEST")),
        ]);
    }

    pub fn get_mut(&mut self, slot: ShaderSlot, alpha_test: bool) -> Option<&mut ShaderProgram<B>> {
        self.slots
            .get_mut(usize::from(slot.0))
            .and_then(Option::as_mut)
            .map(|variants| &mut variants[usize::from(alpha_test)])
    }

    pub fn release_all(&mut self, backend: &mut B) {
        for variants in self.slots.iter_mut().flatten() {
            for variant in variants.iter_mut() {
                variant.release(backend);
            }
        }
        self.slots.clear();
    }
}
