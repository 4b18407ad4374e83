#![allow(dead_code, clippy::unwrap_used)]
// Shared fixtures for alarmlink-core integration tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use alarmlink_api::{AlarmApi, Error, Partition, PartitionAttributes, Session, SystemId, SystemState};
use alarmlink_core::{CapabilitySink, CapabilityStore, Credentials, Device, DeviceConfig};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

/// How the next `login` call behaves.
#[derive(Debug, Clone)]
pub enum LoginScript {
    Succeed(Vec<&'static str>),
    Reject(&'static str),
}

/// One scripted `get_state` reply. When the queue is empty the current
/// code is returned.
#[derive(Debug, Clone)]
pub enum StateReply {
    Code(i64),
    AuthError,
    ServerError(&'static str),
    NoPartitions,
}

/// Recording `AlarmApi` double.
pub struct MockApi {
    login_script: Mutex<LoginScript>,
    state_queue: Mutex<VecDeque<StateReply>>,
    code: AtomicI64,
    /// When set, accepted commands move the panel to the commanded state.
    pub panel_follows: AtomicBool,
    /// When set, every arm/disarm call is refused with HTTP 409.
    pub reject_actions: AtomicBool,
    pub logins: AtomicUsize,
    pub state_calls: AtomicUsize,
    pub arm_away_calls: AtomicUsize,
    pub arm_stay_calls: AtomicUsize,
    pub disarm_calls: AtomicUsize,
    pub last_pin: Mutex<Option<String>>,
    pub partitions: Mutex<Vec<(&'static str, Option<&'static str>)>>,
}

impl MockApi {
    pub fn new(code: i64) -> Arc<Self> {
        Arc::new(Self {
            login_script: Mutex::new(LoginScript::Succeed(vec!["sys-1"])),
            state_queue: Mutex::new(VecDeque::new()),
            code: AtomicI64::new(code),
            panel_follows: AtomicBool::new(false),
            reject_actions: AtomicBool::new(false),
            logins: AtomicUsize::new(0),
            state_calls: AtomicUsize::new(0),
            arm_away_calls: AtomicUsize::new(0),
            arm_stay_calls: AtomicUsize::new(0),
            disarm_calls: AtomicUsize::new(0),
            last_pin: Mutex::new(None),
            partitions: Mutex::new(vec![("part-1", Some("House"))]),
        })
    }

    pub fn set_code(&self, code: i64) {
        self.code.store(code, Ordering::SeqCst);
    }

    pub fn set_login(&self, script: LoginScript) {
        *self.login_script.lock().unwrap() = script;
    }

    pub fn push_state(&self, reply: StateReply) {
        self.state_queue.lock().unwrap().push_back(reply);
    }

    pub fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn state_calls(&self) -> usize {
        self.state_calls.load(Ordering::SeqCst)
    }

    pub fn action_calls(&self) -> usize {
        self.arm_away_calls.load(Ordering::SeqCst)
            + self.arm_stay_calls.load(Ordering::SeqCst)
            + self.disarm_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.logins() + self.state_calls() + self.action_calls()
    }

    fn state_for(&self, code: i64) -> SystemState {
        let partitions = self
            .partitions
            .lock()
            .unwrap()
            .iter()
            .map(|(id, description)| Partition {
                id: (*id).to_string(),
                attributes: PartitionAttributes {
                    description: description.map(str::to_string),
                    state: code,
                    arm_type: None,
                },
            })
            .collect();
        SystemState { partitions }
    }

    fn action(
        &self,
        counter: &AtomicUsize,
        new_code: i64,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        counter.fetch_add(1, Ordering::SeqCst);
        *self.last_pin.lock().unwrap() = pin.map(|p| p.expose_secret().to_string());
        if self.reject_actions.load(Ordering::SeqCst) {
            return Err(Error::Api {
                status: 409,
                message: "zone 3 open".into(),
            });
        }
        if self.panel_follows.load(Ordering::SeqCst) {
            self.set_code(new_code);
        }
        Ok(())
    }
}

#[async_trait]
impl AlarmApi for MockApi {
    async fn login(
        &self,
        _username: &str,
        _password: &SecretString,
        _provider: Option<&str>,
    ) -> Result<Session, Error> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        match self.login_script.lock().unwrap().clone() {
            LoginScript::Succeed(systems) => Ok(Session::new(
                SecretString::from("tok".to_string()),
                systems.into_iter().map(SystemId::new).collect(),
            )),
            LoginScript::Reject(message) => Err(Error::Authentication {
                message: message.into(),
            }),
        }
    }

    async fn get_state(&self, _system: &SystemId, _session: &Session) -> Result<SystemState, Error> {
        self.state_calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.state_queue.lock().unwrap().pop_front();
        match reply {
            None => Ok(self.state_for(self.code.load(Ordering::SeqCst))),
            Some(StateReply::Code(code)) => Ok(self.state_for(code)),
            Some(StateReply::AuthError) => Err(Error::Api {
                status: 500,
                message: "Not authenticated".into(),
            }),
            Some(StateReply::ServerError(message)) => Err(Error::Api {
                status: 502,
                message: message.into(),
            }),
            Some(StateReply::NoPartitions) => Ok(SystemState::default()),
        }
    }

    async fn arm_away(
        &self,
        _system: &SystemId,
        _session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.action(&self.arm_away_calls, 3, pin)
    }

    async fn arm_stay(
        &self,
        _system: &SystemId,
        _session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.action(&self.arm_stay_calls, 2, pin)
    }

    async fn disarm(
        &self,
        _system: &SystemId,
        _session: &Session,
        pin: Option<&SecretString>,
    ) -> Result<(), Error> {
        self.action(&self.disarm_calls, 1, pin)
    }
}

pub fn credentials() -> Credentials {
    Credentials::new("owner@example.com", SecretString::from("hunter2".to_string()))
}

pub fn config() -> DeviceConfig {
    DeviceConfig::new(credentials())
}

/// A device wired to `api` and an in-memory store.
pub fn device_with(api: &Arc<MockApi>, config: DeviceConfig) -> (Device, Arc<CapabilityStore>) {
    let store = Arc::new(CapabilityStore::new());
    let device = Device::new(
        "part-1",
        config,
        Arc::clone(api) as Arc<dyn AlarmApi>,
        Arc::clone(&store) as Arc<dyn CapabilitySink>,
    );
    (device, store)
}
