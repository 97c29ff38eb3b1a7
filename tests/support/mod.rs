use std::path::{Path, PathBuf};

use hearth::config::Config;
use hearth::household::Member;
use hearth::service::TaskService;
use hearth::storage::Storage;
use hearth::task::{Task, TaskDraft};
use tempfile::TempDir;
use uuid::Uuid;

/// A seeded data root: one household with an owner and two members.
pub struct TestHome {
    dir: TempDir,
    pub storage: Storage,
    pub household: Uuid,
    pub owner: Member,
    pub members: Vec<Member>,
}

impl TestHome {
    pub fn init() -> Self {
        Self::init_with_config(Config::default())
    }

    pub fn init_with_config(config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let storage = Storage::new(dir.path().join(".hearth"));
        storage.init().expect("storage init");

        let (household, owner) = storage
            .update_registry(|registry| registry.create_household("Test Household", "alice"))
            .expect("create household");

        let mut members = Vec::new();
        for name in ["bella", "carol"] {
            let member = storage
                .update_registry(|registry| {
                    let code = registry.household(household.id)?.invite_code.clone();
                    registry.join_household(&code, name, Some(owner.id))
                })
                .expect("join household");
            members.push(member);
        }

        // Config is written so spawned CLI processes pick it up too
        let toml = toml::to_string_pretty(&config).expect("serialize config");
        std::fs::write(dir.path().join("hearth.toml"), toml).expect("write config");

        Self {
            dir,
            storage,
            household: household.id,
            owner,
            members,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join(".hearth")
    }

    pub fn config(&self) -> Config {
        Config::load_from_dir(self.dir.path()).expect("load config")
    }

    pub fn service(&self) -> TaskService {
        TaskService::new(self.storage.clone(), self.config()).expect("build service")
    }

    pub fn add_task(&self, title: &str) -> Task {
        self.service()
            .create_task(self.household, self.owner.id, TaskDraft::new(title))
            .expect("create task")
    }
}
