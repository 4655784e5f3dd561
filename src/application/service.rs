// Copyright (c) 2026 BaseState LLC
// SPDX-License-Identifier: MIT

//! Service lifecycle controller.
//!
//! One [`DesktopService`] exists per worker and walks a fixed lifecycle:
//! `onPrepare` (resolve binaries, rewrite capabilities, start drivers) →
//! `before` (wire per-instance runtime state and the command surface) →
//! per-test hooks → `after` → `onComplete`. Prepare/before failures abort
//! the session; per-test hook failures are logged and swallowed; teardown
//! failures are suppressed after logging.

use crate::application::browser::{BrowserParts, DesktopBrowser};
use crate::application::deeplink::DeeplinkTrigger;
use crate::application::execute::ExecuteBridge;
use crate::application::log_capture::LogCapture;
use crate::application::mocks::MockEngine;
use crate::application::windows::{DriverWindowSource, MultiRemoteWindowManager, WindowTracker};
use crate::domain::binary::{BinaryPathResult, BuildType, Os, Platform};
use crate::domain::errors::{DriverError, ServiceError};
use crate::domain::options::{Framework, ServiceOptions, framework_from_capability};
use crate::domain::session_port::DriverSession;
use crate::infrastructure::apparmor::{ApparmorInstaller, InstalledProfile};
use crate::infrastructure::binary_resolver;
use crate::infrastructure::cdp::{CdpBridge, CdpBridgeConfig, discover_main_target};
use crate::infrastructure::config::read_build_info;
use crate::infrastructure::driver::{TauriDriverSupervisor, check_platform_webdriver};
use crate::infrastructure::driver::tauri_driver::{install_tauri_driver, locate_tauri_driver};
use crate::infrastructure::logging::{LogSink, LoggerFactory};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle phases, strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Prepared,
    Running,
    Finished,
}

impl Phase {
    const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Prepared => "prepared",
            Self::Running => "running",
            Self::Finished => "finished",
        }
    }
}

/// A capability entering `onPrepare`, optionally named (multiremote).
#[derive(Debug, Clone)]
pub struct NamedCapability {
    /// Instance name in a multiremote session.
    pub name: Option<String>,
    /// The WebDriver capability object; mutated in place by `onPrepare`.
    pub capability: Value,
}

/// Everything `onPrepare` derived for one capability.
#[derive(Debug, Clone)]
pub struct PreparedCapability {
    /// Instance name in a multiremote session.
    pub instance: Option<String>,
    /// Framework this capability drives.
    pub framework: Framework,
    /// Merged (service ⊕ capability) options.
    pub options: ServiceOptions,
    /// Full binary resolution log.
    pub binary: BinaryPathResult,
    /// Inspector port injected into the launch args (Electron).
    pub inspect_port: Option<u16>,
}

struct InstanceRuntime {
    name: Option<String>,
    browser: DesktopBrowser,
    bridge: Option<Arc<CdpBridge>>,
    capture: Arc<LogCapture>,
}

/// Per-worker service controller.
pub struct DesktopService {
    phase: Phase,
    service_options: ServiceOptions,
    project_root: PathBuf,
    platform: Platform,
    logger_factory: Arc<LoggerFactory>,
    prepared: Vec<PreparedCapability>,
    instances: Vec<InstanceRuntime>,
    window_manager: MultiRemoteWindowManager,
    supervisor: Option<TauriDriverSupervisor>,
    apparmor: Option<(ApparmorInstaller, InstalledProfile)>,
}

impl DesktopService {
    /// Service over the detected platform, logging through `tracing`.
    #[must_use]
    pub fn new(service_options: ServiceOptions, project_root: &Path) -> Self {
        Self::with_platform_and_sink(
            service_options,
            project_root,
            Platform::detect(),
            Arc::new(crate::infrastructure::logging::TracingSink),
        )
    }

    /// Fully injectable constructor (tests, standalone mode).
    #[must_use]
    pub fn with_platform_and_sink(
        service_options: ServiceOptions,
        project_root: &Path,
        platform: Platform,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            phase: Phase::Init,
            service_options,
            project_root: project_root.to_path_buf(),
            platform,
            logger_factory: Arc::new(LoggerFactory::new(sink)),
            prepared: Vec::new(),
            instances: Vec::new(),
            window_manager: MultiRemoteWindowManager::new(),
            supervisor: None,
            apparmor: None,
        }
    }

    fn expect_phase(&self, expected: Phase, hook: &'static str) -> Result<(), ServiceError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(ServiceError::Lifecycle {
                from: self.phase.name(),
                to: hook,
            })
        }
    }

    /// Capabilities prepared so far.
    #[must_use]
    pub fn prepared_capabilities(&self) -> &[PreparedCapability] {
        &self.prepared
    }

    /// The logger factory for this worker.
    #[must_use]
    pub fn logger_factory(&self) -> Arc<LoggerFactory> {
        Arc::clone(&self.logger_factory)
    }

    /// Runs once per test-runner invocation: resolve every capability's
    /// binary, rewrite the capability for its native driver, start external
    /// drivers, and (Linux, opt-in) install the AppArmor profile.
    ///
    /// # Errors
    ///
    /// Config and binary-resolution failures are fatal, as are missing
    /// drivers that auto-install could not fix.
    pub async fn on_prepare(
        &mut self,
        capabilities: &mut [NamedCapability],
    ) -> Result<(), ServiceError> {
        self.expect_phase(Phase::Init, "onPrepare")?;
        let logger = self.logger_factory.create("wdio-desktop", "service");

        for named in capabilities.iter_mut() {
            let Some(framework) = framework_from_capability(&named.capability) else {
                // Not one of ours; leave it untouched.
                continue;
            };
            let options = self
                .service_options
                .merge_from_capability(framework, &named.capability)
                .map_err(ServiceError::InvalidOptions)?;

            if framework == Framework::Tauri
                && options.app_entry_point.is_some()
                && options.app_binary_path.is_some()
            {
                logger.warn("appEntryPoint is ignored for Tauri when appBinaryPath is set");
            }

            let binary = self.resolve_binary(framework, &options)?;
            let Some(binary_path) = binary.binary_path.clone() else {
                return Err(ServiceError::BinaryNotFound {
                    attempts: binary.attempts,
                });
            };

            let mut inspect_port = None;
            match framework {
                Framework::Electron => {
                    let port = free_port()?;
                    prepare_electron_capability(
                        &mut named.capability,
                        &binary_path,
                        port,
                        options.app_args.as_deref().unwrap_or(&[]),
                    );
                    inspect_port = Some(port);
                }
                Framework::Tauri => {
                    prepare_tauri_capability(
                        &mut named.capability,
                        &binary_path,
                        options.app_args.as_deref().unwrap_or(&[]),
                    );
                    self.ensure_tauri_driver(&options).await?;
                }
            }

            if self.platform.os == Os::Linux {
                self.install_apparmor(&options, &binary_path, &logger);
            }

            self.prepared.push(PreparedCapability {
                instance: named.name.clone(),
                framework,
                options,
                binary,
                inspect_port,
            });
        }

        self.phase = Phase::Prepared;
        Ok(())
    }

    fn resolve_binary(
        &self,
        framework: Framework,
        options: &ServiceOptions,
    ) -> Result<BinaryPathResult, ServiceError> {
        // Electron documents appEntryPoint winning over appBinaryPath.
        if framework == Framework::Electron
            && let Some(entry_point) = &options.app_entry_point
        {
            return self.resolve_entry_point(entry_point);
        }
        if let Some(explicit) = &options.app_binary_path {
            let path = self.project_root.join(explicit);
            return Ok(binary_resolver::resolve_explicit(&path, self.platform));
        }

        let build_info = read_build_info(&self.project_root)?;
        Ok(binary_resolver::resolve(
            &self.project_root,
            &build_info,
            self.platform,
            options.app_build_type.unwrap_or(BuildType::Release),
        ))
    }

    /// An unpackaged app runs through the project-local electron binary
    /// with the entry point as its first argument.
    fn resolve_entry_point(&self, entry_point: &str) -> Result<BinaryPathResult, ServiceError> {
        let electron = self
            .project_root
            .join("node_modules")
            .join(".bin")
            .join(if self.platform.os == Os::Windows {
                "electron.cmd"
            } else {
                "electron"
            });
        let result = binary_resolver::resolve_explicit(&electron, self.platform);
        if result.success {
            tracing::debug!(
                "running unpackaged entry point {entry_point} through {}",
                electron.display()
            );
        }
        Ok(result)
    }

    async fn ensure_tauri_driver(&mut self, options: &ServiceOptions) -> Result<(), ServiceError> {
        if self.supervisor.is_some() {
            return Ok(());
        }

        let webdriver = check_platform_webdriver(self.platform)?;
        if !webdriver.success {
            return Err(DriverError::NotFound {
                binary: "WebKitWebDriver".to_string(),
                install_instructions: webdriver
                    .install_instructions
                    .unwrap_or_else(|| "install your distribution's WebKit WebDriver".to_string()),
            }
            .into());
        }

        let located = match locate_tauri_driver(options.tauri_driver_path.as_deref()) {
            Some(path) => path,
            None if options.auto_install_tauri_driver.unwrap_or(false) => {
                install_tauri_driver()?;
                locate_tauri_driver(None).ok_or_else(|| DriverError::NotFound {
                    binary: "tauri-driver".to_string(),
                    install_instructions: "cargo install tauri-driver".to_string(),
                })?
            }
            None => {
                return Err(DriverError::NotFound {
                    binary: "tauri-driver".to_string(),
                    install_instructions: "cargo install tauri-driver".to_string(),
                }
                .into());
            }
        };

        let mut supervisor = TauriDriverSupervisor::new(located, options.tauri_driver_port());
        supervisor
            .start(
                webdriver.path.as_ref(),
                Duration::from_millis(options.start_timeout_ms()),
            )
            .await?;
        self.supervisor = Some(supervisor);
        Ok(())
    }

    fn install_apparmor(
        &mut self,
        options: &ServiceOptions,
        binary_path: &Path,
        logger: &crate::infrastructure::logging::Logger,
    ) {
        if self.apparmor.is_some() {
            return;
        }
        let mode = options.apparmor_auto_install.unwrap_or_default();
        let installer = ApparmorInstaller::new(mode);
        match installer.install(binary_path) {
            Ok(Some(profile)) => {
                logger.info(&format!(
                    "installed AppArmor userns profile {}",
                    profile.path.display()
                ));
                self.apparmor = Some((installer, profile));
            }
            Ok(None) => {}
            // AppArmor trouble never aborts the session.
            Err(detail) => logger.warn(&format!("AppArmor profile not installed: {detail}")),
        }
    }

    /// Runs once per worker with the driver sessions the runner (or the
    /// standalone bootstrapper) established. Wires per-instance state and
    /// returns the command surfaces.
    ///
    /// # Errors
    ///
    /// Fatal on missing prepared capabilities or an unreachable Tauri
    /// plugin. A failed CDP connection is **not** fatal: main-process
    /// features are disabled with a warning and the session continues.
    pub async fn before(
        &mut self,
        sessions: Vec<(Option<String>, Arc<dyn DriverSession>)>,
    ) -> Result<Vec<DesktopBrowser>, ServiceError> {
        self.expect_phase(Phase::Prepared, "before")?;
        let logger = self.logger_factory.create("wdio-desktop", "service");
        let mut browsers = Vec::new();

        for (index, (name, session)) in sessions.into_iter().enumerate() {
            let prepared = self
                .prepared
                .iter()
                .find(|p| p.instance == name)
                .or_else(|| self.prepared.get(index))
                .ok_or_else(|| {
                    ServiceError::InvalidOptions(format!(
                        "no prepared capability for instance {name:?}"
                    ))
                })?
                .clone();

            let bridge = match (prepared.framework, prepared.inspect_port) {
                (Framework::Electron, Some(port)) => {
                    match self.connect_cdp(port, &prepared.options).await {
                        Ok(bridge) => Some(Arc::new(bridge)),
                        Err(e) => {
                            logger.warn(&format!(
                                "CDP bridge unavailable, disabling main-process features: {e}"
                            ));
                            None
                        }
                    }
                }
                _ => None,
            };

            let executor = Arc::new(match prepared.framework {
                Framework::Electron => ExecuteBridge::electron(
                    bridge.clone(),
                    Arc::clone(&session),
                    prepared.options.command_timeout_ms(),
                ),
                Framework::Tauri => {
                    ExecuteBridge::tauri(Arc::clone(&session), prepared.options.command_timeout_ms())
                }
            });

            if prepared.framework == Framework::Tauri {
                // The shim must finish initializing before the first execute.
                executor.wait_for_tauri_init().await?;
            }

            let tracker = Arc::new(WindowTracker::new(Arc::new(DriverWindowSource::new(
                Arc::clone(&session),
            ))));
            let instance_key = name.clone().unwrap_or_default();
            self.window_manager.register(&instance_key, Arc::clone(&tracker));

            let capture = Arc::new(LogCapture::new(
                prepared.framework,
                name.clone(),
                self.logger_factory.sink(),
            ));
            self.attach_log_capture(&prepared, &capture, bridge.as_ref(), &logger)
                .await;

            let deeplink = (prepared.framework == Framework::Electron).then(|| {
                Arc::new(DeeplinkTrigger::new(
                    Arc::clone(&executor),
                    self.platform.os,
                    prepared.options.app_binary_path.is_some()
                        || prepared.binary.binary_path.is_some(),
                ))
            });

            let browser = DesktopBrowser::new(BrowserParts {
                instance: name.clone(),
                framework: prepared.framework,
                session,
                mocks: Arc::new(MockEngine::new(prepared.framework, Arc::clone(&executor))),
                executor,
                windows: tracker,
                deeplink,
                options: prepared.options.clone(),
            });

            self.instances.push(InstanceRuntime {
                name,
                browser: browser.clone(),
                bridge,
                capture,
            });
            browsers.push(browser);
        }

        self.phase = Phase::Running;
        Ok(browsers)
    }

    async fn connect_cdp(
        &self,
        port: u16,
        options: &ServiceOptions,
    ) -> Result<CdpBridge, ServiceError> {
        let ws_url = discover_main_target(
            port,
            options.cdp_retry_count(),
            Duration::from_millis(options.cdp_wait_interval_ms()),
        )
        .await?;
        Ok(CdpBridge::connect(
            &ws_url,
            CdpBridgeConfig {
                timeout_ms: options.cdp_bridge_timeout_ms(),
            },
        )
        .await?)
    }

    async fn attach_log_capture(
        &self,
        prepared: &PreparedCapability,
        capture: &Arc<LogCapture>,
        bridge: Option<&Arc<CdpBridge>>,
        logger: &crate::infrastructure::logging::Logger,
    ) {
        match prepared.framework {
            Framework::Electron => {
                if let Some(bridge) = bridge {
                    let attached = capture
                        .attach_electron(
                            Arc::clone(bridge),
                            prepared.options.capture_main_process_logs,
                            prepared.options.capture_renderer_logs,
                        )
                        .await;
                    if let Err(e) = attached {
                        logger.debug(&format!("log capture attach failed: {e}"));
                    }
                } else if prepared.options.capture_main_process_logs.is_some() {
                    logger.warn("main-process log capture disabled: CDP bridge unavailable");
                }
            }
            Framework::Tauri => {
                if let Some(supervisor) = &self.supervisor {
                    capture.attach_tauri(
                        supervisor.subscribe_logs(),
                        prepared.options.capture_backend_logs,
                        prepared.options.capture_frontend_logs,
                    );
                }
            }
        }
    }

    /// Runs before each test: apply the configured mock auto-hooks.
    /// Failures are logged, never propagated — a broken hook must not
    /// abort the worker.
    pub async fn before_test(&self) {
        let logger = self.logger_factory.create("wdio-desktop", "service");
        for instance in &self.instances {
            let engine = instance.browser.mock_engine();
            let options = instance.browser.options().clone();
            if let Err(e) = engine.apply_before_test_hooks(&options).await {
                logger.warn(&format!("mock auto-hook failed: {e}"));
            }
        }
    }

    /// Runs before every driver command: reconcile window focus.
    pub async fn before_command(&self) {
        self.reconcile_windows().await;
    }

    /// Runs after every driver command: reconcile window focus.
    pub async fn after_command(&self) {
        self.reconcile_windows().await;
    }

    async fn reconcile_windows(&self) {
        let changed = self.window_manager.ensure_all_active_windows().await;
        if changed > 0 {
            self.logger_factory
                .create("wdio-desktop", "windows")
                .debug(&format!("active window changed for {changed} instance(s)"));
        }
    }

    /// Runs once per worker at the end: stop log capture, close bridges,
    /// drop the command surfaces. Errors are suppressed after logging.
    pub async fn after(&mut self) {
        let logger = self.logger_factory.create("wdio-desktop", "service");
        for instance in self.instances.drain(..) {
            instance.capture.detach();
            if let Some(bridge) = instance.bridge {
                bridge.close().await;
            }
            let key = instance.name.unwrap_or_default();
            self.window_manager.unregister(&key);
        }
        if self.phase == Phase::Running {
            self.phase = Phase::Prepared;
        }
        logger.debug("worker teardown complete");
    }

    /// Runs once per test-runner invocation at the very end: stop external
    /// drivers and remove artifacts this run created.
    pub async fn on_complete(&mut self) {
        if let Some(mut supervisor) = self.supervisor.take() {
            supervisor.stop().await;
        }
        if let Some((installer, profile)) = self.apparmor.take() {
            installer.remove(&profile);
        }
        self.logger_factory.clear();
        self.phase = Phase::Finished;
    }
}

/// Bind an ephemeral port and release it for the app to claim.
fn free_port() -> Result<u16, ServiceError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))?;
    Ok(listener.local_addr()?.port())
}

/// Rewrite an Electron capability for Chromedriver: point it at the built
/// binary and enable the main-process inspector.
fn prepare_electron_capability(capability: &mut Value, binary: &Path, port: u16, app_args: &[String]) {
    let Some(object) = capability.as_object_mut() else {
        return;
    };
    let chrome_options = object
        .entry("goog:chromeOptions")
        .or_insert_with(|| json!({}));

    chrome_options["binary"] = json!(binary.display().to_string());

    let mut args: Vec<String> = vec![format!("--inspect={port}")];
    args.extend(app_args.iter().cloned());
    if let Some(existing) = chrome_options.get("args").and_then(Value::as_array) {
        let existing: Vec<String> = existing
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect();
        args.extend(existing);
    }
    chrome_options["args"] = json!(args);

    capability["browserName"] = json!("chrome");
}

/// Rewrite a Tauri capability for tauri-driver: the driver does not
/// understand `browserName: tauri|wry`, so it is normalized away.
fn prepare_tauri_capability(capability: &mut Value, binary: &Path, app_args: &[String]) {
    if let Some(object) = capability.as_object_mut() {
        object.remove("browserName");
        object.insert(
            "tauri:options".to_string(),
            json!({
                "application": binary.display().to_string(),
                "args": app_args,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::binary::Arch;
    use crate::domain::session_port::test_support::FakeSession;
    use crate::infrastructure::logging::test_support::CollectingSink;
    use std::fs;

    const LINUX_X64: Platform = Platform {
        os: Os::Linux,
        arch: Arch::X64,
    };

    fn electron_project(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("package.json"),
            r#"{"name": "MyApp", "config": {"forge": {}}}"#,
        )
        .unwrap();
        let binary_dir = dir.join("out/MyApp-linux-x64");
        fs::create_dir_all(&binary_dir).unwrap();
        let binary = binary_dir.join("MyApp");
        fs::write(&binary, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();
        }
        binary
    }

    fn service_for(dir: &Path) -> DesktopService {
        DesktopService::with_platform_and_sink(
            ServiceOptions::default(),
            dir,
            LINUX_X64,
            Arc::new(CollectingSink::default()),
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_on_prepare_resolves_and_rewrites_electron_capability() {
        let dir = tempfile::tempdir().unwrap();
        let binary = electron_project(dir.path());
        let mut service = service_for(dir.path());

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        service.on_prepare(&mut capabilities).await.unwrap();

        let prepared = &service.prepared_capabilities()[0];
        assert!(prepared.binary.success);
        assert_eq!(
            prepared.binary.binary_path.as_deref(),
            Some(binary.as_path())
        );
        let port = prepared.inspect_port.unwrap();

        let capability = &capabilities[0].capability;
        assert_eq!(capability["browserName"], "chrome");
        assert_eq!(
            capability["goog:chromeOptions"]["binary"],
            binary.display().to_string()
        );
        let args = capability["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args[0], format!("--inspect={port}"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_on_prepare_appends_app_args() {
        let dir = tempfile::tempdir().unwrap();
        electron_project(dir.path());
        let mut service = DesktopService::with_platform_and_sink(
            ServiceOptions {
                app_args: Some(vec!["--foo".to_string(), "--bar=1".to_string()]),
                ..Default::default()
            },
            dir.path(),
            LINUX_X64,
            Arc::new(CollectingSink::default()),
        );

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        service.on_prepare(&mut capabilities).await.unwrap();

        let args = capabilities[0].capability["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();
        assert_eq!(args[1], "--foo");
        assert_eq!(args[2], "--bar=1");
    }

    #[tokio::test]
    async fn test_on_prepare_fatal_without_binary() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "MyApp", "config": {"forge": {}}}"#,
        )
        .unwrap();
        let mut service = service_for(dir.path());

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        let err = service.on_prepare(&mut capabilities).await.unwrap_err();
        match err {
            ServiceError::BinaryNotFound { attempts } => {
                assert!(!attempts.is_empty());
            }
            other => panic!("expected BinaryNotFound, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_on_prepare_fatal_without_build_tool() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service_for(dir.path());

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        let err = service.on_prepare(&mut capabilities).await.unwrap_err();
        assert!(matches!(err, ServiceError::NoBuildTool { .. }));
    }

    #[tokio::test]
    async fn test_lifecycle_rejects_out_of_order_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let mut service = service_for(dir.path());

        // before() without onPrepare() is a programmer error.
        let err = service.before(vec![]).await.unwrap_err();
        match err {
            ServiceError::Lifecycle { from, to } => {
                assert_eq!(from, "init");
                assert_eq!(to, "before");
            }
            other => panic!("expected Lifecycle, got {other}"),
        }
    }

    #[test]
    fn test_tauri_capability_normalization() {
        let mut capability = json!({"browserName": "tauri"});
        prepare_tauri_capability(
            &mut capability,
            Path::new("/target/release/demo"),
            &["--flag".to_string()],
        );

        assert!(capability.get("browserName").is_none());
        assert_eq!(capability["tauri:options"]["application"], "/target/release/demo");
        assert_eq!(capability["tauri:options"]["args"][0], "--flag");
    }

    #[test]
    fn test_electron_capability_preserves_existing_chrome_args() {
        let mut capability = json!({
            "browserName": "electron",
            "goog:chromeOptions": {"args": ["--no-sandbox"]}
        });
        prepare_electron_capability(&mut capability, Path::new("/bin/app"), 9229, &[]);

        let args = capability["goog:chromeOptions"]["args"].as_array().unwrap();
        assert_eq!(args[0], "--inspect=9229");
        assert!(args.iter().any(|a| a == "--no-sandbox"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_before_continues_when_cdp_unavailable() {
        // Scenario E5: nothing listens on the inspect port, yet before()
        // completes and renderer-side execution still works.
        let dir = tempfile::tempdir().unwrap();
        electron_project(dir.path());
        let mut service = DesktopService::with_platform_and_sink(
            ServiceOptions {
                cdp_bridge_retry_count: Some(1),
                cdp_bridge_wait_interval: Some(1),
                ..Default::default()
            },
            dir.path(),
            LINUX_X64,
            Arc::new(CollectingSink::default()),
        );

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        service.on_prepare(&mut capabilities).await.unwrap();

        let fake = Arc::new(FakeSession::with_handles(&["w1"]));
        let session: Arc<dyn DriverSession> = Arc::clone(&fake) as Arc<dyn DriverSession>;
        let browsers = service.before(vec![(None, session)]).await.unwrap();
        assert_eq!(browsers.len(), 1);

        // Main-process execute is disabled with the documented error…
        let err = browsers[0]
            .execute("(e) => e.app.getName()", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("CDP bridge unavailable"));

        service.after().await;
        service.on_complete().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_full_lifecycle_without_tests_leaves_no_state() {
        let dir = tempfile::tempdir().unwrap();
        electron_project(dir.path());
        let mut service = DesktopService::with_platform_and_sink(
            ServiceOptions {
                cdp_bridge_retry_count: Some(1),
                cdp_bridge_wait_interval: Some(1),
                ..Default::default()
            },
            dir.path(),
            LINUX_X64,
            Arc::new(CollectingSink::default()),
        );

        let mut capabilities = vec![NamedCapability {
            name: None,
            capability: json!({"browserName": "electron"}),
        }];
        service.on_prepare(&mut capabilities).await.unwrap();

        let session: Arc<dyn DriverSession> =
            Arc::new(FakeSession::with_handles(&["w1"])) as Arc<dyn DriverSession>;
        service.before(vec![(None, session)]).await.unwrap();
        service.before_test().await;
        service.before_command().await;
        service.after_command().await;
        service.after().await;
        service.on_complete().await;

        assert!(service.instances.is_empty());
        assert!(service.supervisor.is_none());
        assert!(service.apparmor.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_multiremote_instances_resolved_by_name() {
        let dir = tempfile::tempdir().unwrap();
        electron_project(dir.path());
        let mut service = DesktopService::with_platform_and_sink(
            ServiceOptions {
                cdp_bridge_retry_count: Some(1),
                cdp_bridge_wait_interval: Some(1),
                ..Default::default()
            },
            dir.path(),
            LINUX_X64,
            Arc::new(CollectingSink::default()),
        );

        let mut capabilities = vec![
            NamedCapability {
                name: Some("browserA".to_string()),
                capability: json!({"browserName": "electron"}),
            },
            NamedCapability {
                name: Some("browserB".to_string()),
                capability: json!({"browserName": "electron"}),
            },
        ];
        service.on_prepare(&mut capabilities).await.unwrap();
        assert_eq!(service.prepared_capabilities().len(), 2);

        let session_a: Arc<dyn DriverSession> =
            Arc::new(FakeSession::with_handles(&["a1"])) as Arc<dyn DriverSession>;
        let session_b: Arc<dyn DriverSession> =
            Arc::new(FakeSession::with_handles(&["b1"])) as Arc<dyn DriverSession>;
        let browsers = service
            .before(vec![
                (Some("browserA".to_string()), session_a),
                (Some("browserB".to_string()), session_b),
            ])
            .await
            .unwrap();

        assert_eq!(browsers[0].instance_name(), Some("browserA"));
        assert_eq!(browsers[1].instance_name(), Some("browserB"));
    }
}
