//! In-memory container engine and invoker for session tests

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;

use docktrim::command::{CommandShape, ImageConfig};
use docktrim::config::TrimConfig;
use docktrim::engine::{
    ContainerEngine, EngineError, ExecOutput, ImageInspector, MemoryStats, RunSpec,
};
use docktrim::invoke::{InvocationOutcome, Invoker};

/// How a fake teardown step behaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepMode {
    Ok,
    NotFound,
    Rejected,
}

impl StepMode {
    fn apply(self, what: &str) -> Result<(), EngineError> {
        match self {
            StepMode::Ok => Ok(()),
            StepMode::NotFound => Err(EngineError::NotFound(format!("No such container: {what}"))),
            StepMode::Rejected => Err(EngineError::Rejected {
                command: format!("docker {what}"),
                status: 1,
                stderr: "daemon busy".to_string(),
            }),
        }
    }
}

pub struct FakeEngine {
    pub images: HashMap<String, ImageConfig>,
    pub create_rejected: bool,
    /// `start` fails after `create` registered the container
    pub start_rejected: bool,
    pub statuses: RefCell<VecDeque<String>>,
    pub logs: String,
    /// `None` makes `cat` of the trace log exit non-zero
    pub trace_log: Option<String>,
    /// Queued `find` results: `Ok(stdout)` or `Err(exit_code)`
    pub listings: RefCell<VecDeque<Result<String, i32>>>,
    pub stop_mode: StepMode,
    pub remove_mode: StepMode,
    pub memory: Option<MemoryStats>,

    /// Live containers by id
    pub containers: RefCell<HashMap<String, RunSpec>>,
    pub calls: RefCell<Vec<String>>,
    pub last_spec: RefCell<Option<RunSpec>>,
    pub next_id: RefCell<u32>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        let mut images = HashMap::new();
        images.insert(
            "docker-image:test".to_string(),
            ImageConfig {
                entrypoint: CommandShape::Many(vec!["/lambda-entrypoint.sh".to_string()]),
                cmd: CommandShape::Many(vec!["lambda_function.lambda_handler".to_string()]),
            },
        );
        images.insert("scratch:empty".to_string(), ImageConfig::default());

        Self {
            images,
            create_rejected: false,
            start_rejected: false,
            statuses: RefCell::new(VecDeque::new()),
            logs: "START RequestId: 1\n".to_string(),
            trace_log: Some(String::new()),
            listings: RefCell::new(VecDeque::new()),
            stop_mode: StepMode::Ok,
            remove_mode: StepMode::Ok,
            memory: Some(MemoryStats {
                usage_bytes: 50,
                limit_bytes: Some(200),
            }),
            containers: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            last_spec: RefCell::new(None),
            next_id: RefCell::new(0),
        }
    }
}

impl FakeEngine {
    pub fn with_trace_log(mut self, log: &str) -> Self {
        self.trace_log = Some(log.to_string());
        self
    }

    pub fn with_statuses(self, statuses: &[&str]) -> Self {
        *self.statuses.borrow_mut() = statuses.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_listings(self, listings: Vec<Result<String, i32>>) -> Self {
        *self.listings.borrow_mut() = listings.into();
        self
    }

    /// Host path of the wrapper mounted into the last created container
    pub fn wrapper_host_path(&self) -> Option<PathBuf> {
        let spec = self.last_spec.borrow();
        let volume = spec.as_ref()?.volumes.first()?.clone();
        volume.split(':').next().map(PathBuf::from)
    }

    pub fn live_containers(&self) -> usize {
        self.containers.borrow().len()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.borrow().iter().any(|c| c == name)
    }

    fn log_call(&self, name: &str) {
        self.calls.borrow_mut().push(name.to_string());
    }
}

impl ImageInspector for FakeEngine {
    fn inspect_image(&self, image: &str) -> Result<ImageConfig, EngineError> {
        self.log_call("inspect");
        self.images
            .get(image)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("No such image: {image}")))
    }
}

impl ContainerEngine for FakeEngine {
    fn create(&self, spec: &RunSpec) -> Result<String, EngineError> {
        self.log_call("create");
        *self.last_spec.borrow_mut() = Some(spec.clone());
        if self.create_rejected {
            return Err(EngineError::Rejected {
                command: "docker create".to_string(),
                status: 125,
                stderr: "invalid reference format".to_string(),
            });
        }
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        let id = format!("fake{}", *next);
        self.containers.borrow_mut().insert(id.clone(), spec.clone());
        Ok(id)
    }

    fn start(&self, id: &str) -> Result<(), EngineError> {
        self.log_call("start");
        if self.start_rejected {
            return Err(EngineError::Rejected {
                command: format!("docker start {id}"),
                status: 126,
                stderr: "failed to create task: exec: \"/wrapper.sh\": permission denied".to_string(),
            });
        }
        Ok(())
    }

    fn status(&self, id: &str) -> Result<String, EngineError> {
        self.log_call("status");
        if !self.containers.borrow().contains_key(id) {
            return Err(EngineError::NotFound(id.to_string()));
        }
        let mut statuses = self.statuses.borrow_mut();
        let status = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(status.unwrap_or_else(|| "running".to_string()))
    }

    fn logs(&self, _id: &str) -> Result<String, EngineError> {
        self.log_call("logs");
        Ok(self.logs.clone())
    }

    fn exec(&self, _id: &str, argv: &[String]) -> Result<ExecOutput, EngineError> {
        match argv.first().map(String::as_str) {
            Some("cat") => {
                self.log_call("cat");
                Ok(match &self.trace_log {
                    Some(log) => ExecOutput {
                        exit_code: 0,
                        output: log.as_bytes().to_vec(),
                    },
                    None => ExecOutput {
                        exit_code: 1,
                        output: b"cat: /tmp/strace.log: No such file or directory".to_vec(),
                    },
                })
            }
            Some("find") => {
                self.log_call("find");
                Ok(match self.listings.borrow_mut().pop_front() {
                    Some(Ok(stdout)) => ExecOutput {
                        exit_code: 0,
                        output: stdout.into_bytes(),
                    },
                    Some(Err(code)) => ExecOutput {
                        exit_code: code,
                        output: b"find: '/proc/1/fd/5': No such file or directory".to_vec(),
                    },
                    None => ExecOutput {
                        exit_code: 0,
                        output: Vec::new(),
                    },
                })
            }
            _ => Ok(ExecOutput {
                exit_code: 127,
                output: Vec::new(),
            }),
        }
    }

    fn stop(&self, id: &str) -> Result<(), EngineError> {
        self.log_call("stop");
        self.stop_mode.apply(id)
    }

    fn remove(&self, id: &str) -> Result<(), EngineError> {
        self.log_call("remove");
        self.remove_mode.apply(id)?;
        self.containers.borrow_mut().remove(id);
        Ok(())
    }

    fn memory_stats(&self, id: &str) -> Result<MemoryStats, EngineError> {
        self.log_call("stats");
        self.memory
            .ok_or_else(|| EngineError::Parse(format!("no stats for {id}")))
    }
}

pub enum InvokeMode {
    Respond(u16, &'static str),
    Panic,
}

pub struct FakeInvoker {
    pub mode: InvokeMode,
    pub inputs: RefCell<Vec<String>>,
}

impl FakeInvoker {
    pub fn ok() -> Self {
        Self::new(InvokeMode::Respond(200, "{\"statusCode\": 200}"))
    }

    pub fn new(mode: InvokeMode) -> Self {
        Self {
            mode,
            inputs: RefCell::new(Vec::new()),
        }
    }
}

impl Invoker for FakeInvoker {
    fn invoke(&self, input_text: &str) -> InvocationOutcome {
        self.inputs.borrow_mut().push(input_text.to_string());
        match self.mode {
            InvokeMode::Respond(status, body) => InvocationOutcome {
                status,
                body: body.to_string(),
            },
            InvokeMode::Panic => panic!("invoker exploded"),
        }
    }
}

/// Configuration with no readiness wait so tests run instantly
pub fn fast_config() -> TrimConfig {
    TrimConfig {
        readiness_settle: 0,
        readiness_timeout: 0,
        readiness_poll_interval: 10,
        ..TrimConfig::default()
    }
}
