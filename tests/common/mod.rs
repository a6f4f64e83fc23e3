//! Shared test fixtures: a recording kernel module.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use gpu_fft2d::fft::{Bindings, FftError, KernelId, KernelModule, PassFlags};

/// One call observed by [`MockModule`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Keyword(String, bool),
    Allocate { elements: usize, element_size: usize },
    Release { id: usize },
    Bind { kernel: KernelId, name: String, buffer: usize },
    Begin,
    Dispatch {
        kernel: KernelId,
        bound: Vec<&'static str>,
        flags: PassFlags,
        groups: [u32; 3],
    },
    Submit,
}

/// State shared between a test and the module it hands to the runtime.
#[derive(Debug, Default)]
pub struct MockLog {
    pub calls: Vec<Call>,
    pub keywords: BTreeMap<String, bool>,
    pub allocations: usize,
    pub releases: usize,
}

impl MockLog {
    pub fn enabled_keywords(&self) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(keyword, _)| keyword.clone())
            .collect()
    }

    pub fn dispatches(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|call| matches!(call, Call::Dispatch { .. }))
            .cloned()
            .collect()
    }
}

/// Scratch buffer handle: allocation id plus element count.
#[derive(Debug, PartialEq)]
pub struct MockBuffer {
    pub id: usize,
    pub elements: usize,
}

/// Square or rectangular surface stand-in.
#[derive(Debug, Clone, Copy)]
pub struct MockSurface {
    pub width: u32,
    pub height: u32,
}

impl MockSurface {
    pub fn square(size: u32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }
}

/// Kernel module that records every call into a shared [`MockLog`].
pub struct MockModule {
    kernels: Vec<&'static str>,
    log: Rc<RefCell<MockLog>>,
}

impl MockModule {
    /// Module exposing `R2C`, `C2R` and `R2R`.
    pub fn new() -> (Self, Rc<RefCell<MockLog>>) {
        Self::with_kernels(&["R2C", "C2R", "R2R"])
    }

    pub fn with_kernels(kernels: &[&'static str]) -> (Self, Rc<RefCell<MockLog>>) {
        let log = Rc::new(RefCell::new(MockLog::default()));
        let module = Self {
            kernels: kernels.to_vec(),
            log: log.clone(),
        };
        (module, log)
    }
}

impl KernelModule for MockModule {
    type Buffer = MockBuffer;
    type Surface = MockSurface;
    type Encoder = Vec<String>;

    fn find_kernel(&self, name: &str) -> Option<KernelId> {
        self.kernels
            .iter()
            .position(|k| *k == name)
            .map(|i| KernelId(i as u32))
    }

    fn set_keyword(&mut self, keyword: &str, enabled: bool) {
        let mut log = self.log.borrow_mut();
        log.keywords.insert(keyword.to_string(), enabled);
        log.calls.push(Call::Keyword(keyword.to_string(), enabled));
    }

    fn allocate_buffer(
        &mut self,
        element_count: usize,
        element_size: usize,
    ) -> Result<MockBuffer, FftError> {
        let mut log = self.log.borrow_mut();
        log.allocations += 1;
        log.calls.push(Call::Allocate {
            elements: element_count,
            element_size,
        });
        Ok(MockBuffer {
            id: log.allocations,
            elements: element_count,
        })
    }

    fn release_buffer(&mut self, buffer: MockBuffer) {
        let mut log = self.log.borrow_mut();
        log.releases += 1;
        log.calls.push(Call::Release { id: buffer.id });
    }

    fn bind_buffer(&mut self, kernel: KernelId, name: &str, buffer: &MockBuffer) {
        self.log.borrow_mut().calls.push(Call::Bind {
            kernel,
            name: name.to_string(),
            buffer: buffer.id,
        });
    }

    fn surface_extent(&self, surface: &MockSurface) -> (u32, u32) {
        (surface.width, surface.height)
    }

    fn begin(&mut self) -> Vec<String> {
        self.log.borrow_mut().calls.push(Call::Begin);
        Vec::new()
    }

    fn dispatch(
        &mut self,
        encoder: &mut Vec<String>,
        kernel: KernelId,
        bindings: Bindings<'_, MockSurface>,
        flags: PassFlags,
        groups: [u32; 3],
    ) -> Result<(), FftError> {
        encoder.push(format!("{:?}", kernel));
        self.log.borrow_mut().calls.push(Call::Dispatch {
            kernel,
            bound: bindings.iter().map(|(name, _)| name).collect(),
            flags,
            groups,
        });
        Ok(())
    }

    fn submit(&mut self, _encoder: Vec<String>) {
        self.log.borrow_mut().calls.push(Call::Submit);
    }
}
