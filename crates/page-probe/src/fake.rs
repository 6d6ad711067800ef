//! Scripted in-memory page for tests.
//!
//! Models the wizard as a sequence of scenes; clicking a scene's trigger
//! advances to the next one, the way a real submission navigates to the
//! next step.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ProbeError;
use crate::ports::{Locator, PagePort};

/// One rendered state of the fake page.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub url: String,
    pub body: String,
    /// Locator keys (`Locator::to_string()`) that exist beyond what the
    /// body text implies.
    pub present: HashSet<String>,
    /// Locator keys reported as disabled.
    pub disabled: HashSet<String>,
    /// Substring of a clicked locator key that advances to the next scene.
    pub advance_on: Option<String>,
}

impl Scene {
    pub fn new(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: body.into(),
            ..Scene::default()
        }
    }

    pub fn with_present(mut self, locator: &Locator) -> Self {
        self.present.insert(locator.to_string());
        self
    }

    pub fn with_disabled(mut self, locator: &Locator) -> Self {
        let key = locator.to_string();
        self.present.insert(key.clone());
        self.disabled.insert(key);
        self
    }

    pub fn advance_on(mut self, trigger: impl Into<String>) -> Self {
        self.advance_on = Some(trigger.into());
        self
    }
}

#[derive(Default)]
struct Inner {
    scene_index: usize,
    fields: HashMap<String, String>,
    /// Remaining fill attempts that will silently not stick, per field.
    flaky_fills: HashMap<String, u32>,
    /// Fields whose fill errors outright, as a detached node would.
    broken_fields: HashSet<String>,
    clicks: Vec<String>,
    /// Every requested fill, in order; survives scene advances.
    fills: Vec<(String, String)>,
    navigations: Vec<String>,
    scripts: Vec<String>,
    reloads: u32,
}

pub struct ScriptedPage {
    scenes: Vec<Scene>,
    nav_targets: HashMap<String, usize>,
    failure: Option<String>,
    inner: Mutex<Inner>,
}

impl ScriptedPage {
    pub fn new(scenes: Vec<Scene>) -> Self {
        assert!(!scenes.is_empty(), "scripted page needs at least one scene");
        Self {
            scenes,
            nav_targets: HashMap::new(),
            failure: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn single(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(vec![Scene::new(url, body)])
    }

    /// A page whose every probe fails with the given browser error.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut page = Self::single("about:blank", "");
        page.failure = Some(message.into());
        page
    }

    /// Direct navigation to `url` jumps to the given scene.
    pub fn with_nav_target(mut self, url: impl Into<String>, scene: usize) -> Self {
        self.nav_targets.insert(url.into(), scene);
        self
    }

    /// The next `failures` fills of this field will not stick.
    pub fn make_field_flaky(&self, locator: &Locator, failures: u32) {
        self.inner
            .lock()
            .unwrap()
            .flaky_fills
            .insert(locator.to_string(), failures);
    }

    /// Fills of this field fail with a browser error.
    pub fn break_field(&self, locator: &Locator) {
        self.inner
            .lock()
            .unwrap()
            .broken_fields
            .insert(locator.to_string());
    }

    pub fn scene_index(&self) -> usize {
        self.inner.lock().unwrap().scene_index
    }

    pub fn clicks(&self) -> Vec<String> {
        self.inner.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().fills.clone()
    }

    pub fn scripts(&self) -> Vec<String> {
        self.inner.lock().unwrap().scripts.clone()
    }

    pub fn reloads(&self) -> u32 {
        self.inner.lock().unwrap().reloads
    }

    pub fn field_value(&self, locator: &Locator) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .fields
            .get(&locator.to_string())
            .cloned()
    }

    fn fail(&self) -> Option<ProbeError> {
        self.failure.clone().map(ProbeError::Browser)
    }

    fn scene(&self) -> Scene {
        let idx = self.inner.lock().unwrap().scene_index;
        self.scenes[idx.min(self.scenes.len() - 1)].clone()
    }

    fn locator_present(&self, scene: &Scene, locator: &Locator) -> bool {
        if scene.present.contains(&locator.to_string()) {
            return true;
        }
        match locator {
            Locator::Text { content, exact } => {
                if *exact {
                    scene.body.lines().any(|line| line.trim() == content)
                } else {
                    scene.body.contains(content.as_str())
                }
            }
            Locator::Labelled(label) => scene.body.contains(label.as_str()),
            Locator::Css(_) => false,
        }
    }
}

#[async_trait]
impl PagePort for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let mut inner = self.inner.lock().unwrap();
        inner.navigations.push(url.to_string());
        if let Some(idx) = self.nav_targets.get(url) {
            inner.scene_index = *idx;
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        self.inner.lock().unwrap().reloads += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        Ok(self.scene().url)
    }

    async fn body_text(&self) -> Result<String, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        Ok(self.scene().body)
    }

    async fn exists(&self, locator: &Locator) -> Result<bool, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let scene = self.scene();
        Ok(self.locator_present(&scene, locator))
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool, ProbeError> {
        self.exists(locator).await
    }

    async fn is_enabled(&self, locator: &Locator) -> Result<Option<bool>, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let scene = self.scene();
        if !self.locator_present(&scene, locator) {
            return Ok(None);
        }
        Ok(Some(!scene.disabled.contains(&locator.to_string())))
    }

    async fn text_of(&self, locator: &Locator) -> Result<Option<String>, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let scene = self.scene();
        if !self.locator_present(&scene, locator) {
            return Ok(None);
        }
        match locator {
            Locator::Text { content, .. } => Ok(Some(content.clone())),
            _ => Ok(Some(scene.body)),
        }
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<(), ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let key = locator.to_string();
        let mut inner = self.inner.lock().unwrap();
        if inner.broken_fields.contains(&key) {
            return Err(ProbeError::Browser(format!("node detached: {key}")));
        }
        inner.fills.push((key.clone(), value.to_string()));
        if let Some(remaining) = inner.flaky_fills.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                inner.fields.insert(key, String::new());
                return Ok(());
            }
        }
        inner.fields.insert(key, value.to_string());
        Ok(())
    }

    async fn read_value(&self, locator: &Locator) -> Result<Option<String>, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        Ok(self
            .inner
            .lock()
            .unwrap()
            .fields
            .get(&locator.to_string())
            .cloned())
    }

    async fn click(&self, locator: &Locator) -> Result<(), ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        let key = locator.to_string();
        let scene = self.scene();
        let mut inner = self.inner.lock().unwrap();
        inner.clicks.push(key.clone());
        if let Some(trigger) = &scene.advance_on {
            if key.contains(trigger.as_str()) && inner.scene_index + 1 < self.scenes.len() {
                inner.scene_index += 1;
                inner.fields.clear();
            }
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        self.inner.lock().unwrap().scripts.push(script.to_string());
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ProbeError> {
        if let Some(err) = self.fail() {
            return Err(err);
        }
        Ok(vec![0x89, 0x50, 0x4e, 0x47])
    }

    async fn settle(&self, duration: Duration) {
        // Tests never need real settle time.
        let _ = duration;
    }
}
