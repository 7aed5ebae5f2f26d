//! End-to-end scenarios over a scripted control connection.
//!
//! Each test feeds a literal server byte stream into the client and drives
//! the tick loop by hand, checking the state machine, the bytes that went
//! out, and the hidden-service results.

use torctl::test_utils::{fixtures, ScriptedTransport};
use torctl::{
    ControlStatus, HiddenService, TorControl, TorControlConfig, TorEvent, TorStatus,
};

fn client(config: TorControlConfig) -> (TorControl<ScriptedTransport>, ScriptedTransport) {
    let control = TorControl::with_config(config);
    let transport = ScriptedTransport::new();
    (control, transport)
}

fn status_walk(events: &mut tokio::sync::broadcast::Receiver<TorEvent>) -> Vec<ControlStatus> {
    let mut walk = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let TorEvent::StatusChanged { status, .. } = event {
            walk.push(status);
        }
    }
    walk
}

// ============================================================================
// Authentication and startup
// ============================================================================

mod startup {
    use super::*;

    #[test]
    fn null_auth_v3_publication_reaches_hidden_service_ready() {
        let (mut control, transport) = client(TorControlConfig::new());
        let mut events = control.subscribe();

        let service = HiddenService::create_new();
        service.add_port(9878, "127.0.0.1", 9878);
        control.add_hidden_service(&service);

        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();

        transport.feed(fixtures::auth_ok());
        control.tick();

        transport.feed(fixtures::tor_info_ready());
        transport.feed(fixtures::add_onion_created(
            "abcdefghijklmnop",
            "ED25519-V3:QkFTRTY0QkxPQg==",
        ));
        control.tick();

        assert_eq!(control.status(), ControlStatus::HiddenServiceReady);
        assert_eq!(control.tor_status(), TorStatus::Ready);
        assert_eq!(control.tor_version(), "0.4.7.13");
        assert_eq!(control.socks_address(), "127.0.0.1");
        assert_eq!(control.socks_port(), 9050);
        assert!(control.has_connectivity());

        assert_eq!(service.hostname().as_deref(), Some("abcdefghijklmnop.onion"));
        assert!(service.is_online());
        let key = service.key().expect("tor handed back a private key");
        assert_eq!(key.wire(), "ED25519-V3:QkFTRTY0QkxPQg==");

        assert_eq!(
            status_walk(&mut events),
            [
                ControlStatus::Connecting,
                ControlStatus::SocketConnected,
                ControlStatus::Authenticating,
                ControlStatus::Authenticated,
                ControlStatus::HiddenServiceReady,
            ]
        );

        let written = transport.written_text();
        assert!(written.starts_with("PROTOCOLINFO 1\r\nAUTHENTICATE\r\n"));
        assert!(written.contains(
            "GETINFO status/circuit-established status/bootstrap-phase net/listeners/socks\r\n"
        ));
        assert!(written.ends_with("ADD_ONION NEW:BEST Port=9878,127.0.0.1:9878\r\n"));
    }

    #[test]
    fn short_cookie_falls_back_to_hashed_password() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_path = dir.path().join("control_auth_cookie");
        std::fs::write(&cookie_path, [0u8; 20]).unwrap();

        let (mut control, transport) = client(TorControlConfig::new().password("hunter2"));
        control.adopt(transport.clone());

        transport.feed(fixtures::protocolinfo_cookie_password(
            cookie_path.to_str().unwrap(),
        ));
        control.tick();

        // The 20-byte cookie is rejected; the configured password goes out
        // hex-encoded instead.
        assert!(transport
            .written_text()
            .ends_with("AUTHENTICATE 68756E74657232\r\n"));

        transport.feed(fixtures::auth_ok());
        control.tick();
        assert_eq!(control.status(), ControlStatus::Authenticated);
    }

    #[test]
    fn cookie_of_proper_length_is_sent_hex_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_path = dir.path().join("control_auth_cookie");
        std::fs::write(&cookie_path, [0xABu8; 32]).unwrap();

        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_cookie_password(
            cookie_path.to_str().unwrap(),
        ));
        control.tick();

        let expected = format!("AUTHENTICATE {}\r\n", "AB".repeat(32));
        assert!(transport.written_text().ends_with(&expected));
    }

    #[test]
    fn rejected_authentication_is_terminal() {
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());

        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_rejected());
        control.tick();

        assert_eq!(control.status(), ControlStatus::Error);
        assert!(!control.error_message().is_empty());
        assert!(control.error_message().contains("Bad authentication"));

        // No STATUS_CLIENT handler was registered, so a late event has no
        // effect.
        transport.feed(fixtures::bootstrap_event(50, "conn_done", "Connecting"));
        control.tick();
        assert!(control.bootstrap_status().is_empty());
        assert_eq!(control.tor_status(), TorStatus::Offline);
    }

    #[test]
    fn cookie_without_password_fallback_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cookie_path = dir.path().join("control_auth_cookie");
        std::fs::write(&cookie_path, [0u8; 20]).unwrap();

        // No password configured: the unusable cookie is fatal.
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_cookie_password(
            cookie_path.to_str().unwrap(),
        ));
        control.tick();

        assert_eq!(control.status(), ControlStatus::Error);
        assert!(control.error_message().contains("cookie unreadable"));
        assert!(control.error_message().contains("unexpected size 20"));
    }
}

// ============================================================================
// Bootstrap and status events
// ============================================================================

mod status_events {
    use super::*;

    fn authenticated_client() -> (TorControl<ScriptedTransport>, ScriptedTransport) {
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();
        (control, transport)
    }

    #[test]
    fn bootstrap_events_update_the_map() {
        let (mut control, transport) = authenticated_client();

        transport.feed(fixtures::bootstrap_event(50, "conn_done", "Connecting"));
        control.tick();

        let bootstrap = control.bootstrap_status();
        assert_eq!(bootstrap.get("progress"), Some("50"));
        assert_eq!(bootstrap.get("tag"), Some("conn_done"));
        assert_eq!(bootstrap.get("summary"), Some("Connecting"));
        assert_eq!(bootstrap.get("severity"), Some("NOTICE"));
        // BOOTSTRAP alone changes no state.
        assert_eq!(control.status(), ControlStatus::Authenticated);
    }

    #[test]
    fn circuit_events_flip_tor_status() {
        let (mut control, transport) = authenticated_client();
        assert_eq!(control.tor_status(), TorStatus::Offline);

        transport.feed(fixtures::circuit_established_event());
        control.tick();
        assert_eq!(control.tor_status(), TorStatus::Ready);

        transport.feed("650 STATUS_CLIENT NOTICE CIRCUIT_NOT_ESTABLISHED\r\n");
        control.tick();
        assert_eq!(control.tor_status(), TorStatus::Offline);
    }

    #[test]
    fn ready_event_requeries_the_socks_listener() {
        let (mut control, transport) = authenticated_client();
        transport.take_written();

        // The startup GETINFO found no listener yet (DisableNetwork case).
        transport.feed(fixtures::tor_info_offline());
        control.tick();
        assert_eq!(control.socks_address(), "");

        transport.feed(fixtures::circuit_established_event());
        control.tick();
        assert!(transport.written_text().contains("GETINFO"));

        transport.feed(fixtures::tor_info_ready());
        control.tick();
        assert_eq!(control.socks_address(), "127.0.0.1");
        assert_eq!(control.socks_port(), 9050);
    }

    #[test]
    fn disconnect_resets_to_not_connected() {
        let (mut control, transport) = authenticated_client();

        transport.close();
        control.tick();

        assert_eq!(control.status(), ControlStatus::NotConnected);
        assert_eq!(control.tor_status(), TorStatus::Unknown);
        assert_eq!(control.tor_version(), "");
        assert_eq!(control.socks_address(), "");
    }
}

// ============================================================================
// Hidden-service publication
// ============================================================================

mod publication {
    use super::*;

    #[test]
    fn legacy_daemon_gets_one_batched_setconf() {
        let (mut control, transport) = client(TorControlConfig::new());

        let service = HiddenService::create_new();
        service.set_data_dir("/var/lib/tor/svc");
        service.set_service_id("legacyserviceid");
        service.add_port(9001, "127.0.0.1", 9001);
        control.add_hidden_service(&service);

        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_legacy());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        assert!(transport.written_text().contains(
            "SETCONF HiddenServiceDir=\"/var/lib/tor/svc\" \
             HiddenServicePort=\"9001 127.0.0.1:9001\"\r\n"
        ));

        // GETINFO is answered first, then the SETCONF acknowledgment.
        transport.feed(fixtures::tor_info_offline());
        transport.feed("250 OK\r\n");
        control.tick();

        assert!(service.is_online());
        assert_eq!(control.status(), ControlStatus::HiddenServiceReady);
    }

    #[test]
    fn legacy_daemon_skips_services_without_a_data_dir() {
        let (mut control, transport) = client(TorControlConfig::new());

        let ephemeral = HiddenService::create_new();
        ephemeral.add_port(9001, "127.0.0.1", 9001);
        control.add_hidden_service(&ephemeral);

        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_legacy());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        assert!(!transport.written_text().contains("SETCONF"));
        assert!(!transport.written_text().contains("ADD_ONION"));
        assert!(!ephemeral.is_online());
    }

    #[test]
    fn republishing_imports_the_stored_key() {
        let key = torctl::CryptoKey::new(torctl::KeyType::Ed25519V3, "QkFTRTY0QkxPQg==").unwrap();
        let (mut control, transport) = client(TorControlConfig::new());

        let service = HiddenService::from_key(key);
        service.add_port(443, "127.0.0.1", 9878);
        control.add_hidden_service(&service);

        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        assert!(transport.written_text().contains(
            "ADD_ONION ED25519-V3:QkFTRTY0QkxPQg== Port=443,127.0.0.1:9878\r\n"
        ));

        transport.feed(fixtures::tor_info_ready());
        transport.feed(fixtures::add_onion_republished("abcdefghijklmnop"));
        control.tick();

        assert!(service.is_online());
        assert_eq!(control.status(), ControlStatus::HiddenServiceReady);
    }

    #[test]
    fn failed_publication_leaves_the_service_offline() {
        let (mut control, transport) = client(TorControlConfig::new());

        let service = HiddenService::create_new();
        service.add_port(80, "127.0.0.1", 8080);
        control.add_hidden_service(&service);

        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        transport.feed(fixtures::tor_info_ready());
        transport.feed("512 Invalid key type\r\n");
        control.tick();

        assert!(!service.is_online());
        // A failed publication does not tear down the connection.
        assert_eq!(control.status(), ControlStatus::Authenticated);
    }
}

// ============================================================================
// Configuration persistence
// ============================================================================

mod configuration {
    use super::*;

    fn owned_authenticated_client() -> (TorControl<ScriptedTransport>, ScriptedTransport) {
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        control.take_ownership();
        // The startup GETINFO is still pending; answer it first, then
        // TAKEOWNERSHIP and the __OwningControllerProcess reset.
        transport.feed(fixtures::tor_info_offline());
        transport.feed("250 OK\r\n250 OK\r\n");
        control.tick();
        (control, transport)
    }

    #[test]
    fn take_ownership_resets_the_owning_process_option() {
        let (control, transport) = owned_authenticated_client();
        assert!(control.has_ownership());
        let written = transport.written_text();
        assert!(written.contains("TAKEOWNERSHIP\r\n"));
        assert!(written.contains("RESETCONF __OwningControllerProcess\r\n"));
    }

    #[test]
    fn save_configuration_refuses_a_non_torrc_path() {
        let (mut control, transport) = owned_authenticated_client();

        let op = control.save_configuration();
        transport.feed(
            "250+config-text=\r\n\
             ControlPort 9051\r\n\
             .\r\n\
             250-config-file=/etc/tor/settings.conf\r\n\
             250 OK\r\n",
        );
        control.tick();

        assert!(op.is_finished());
        assert_eq!(
            op.error_message().as_deref(),
            Some("Refusing to write torrc to unacceptable path /etc/tor/settings.conf")
        );
    }

    #[test]
    fn save_configuration_refuses_a_missing_torrc() {
        let (mut control, transport) = owned_authenticated_client();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torrc");

        let op = control.save_configuration();
        transport.feed(&format!(
            "250+config-text=\r\nControlPort 9051\r\n.\r\n250-config-file={}\r\n250 OK\r\n",
            path.display()
        ));
        control.tick();

        assert!(op.error_message().unwrap_or_default().contains("Refusing"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn save_configuration_writes_filtered_lines() {
        let (mut control, transport) = owned_authenticated_client();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torrc");
        std::fs::write(&path, "stale\n").unwrap();

        let op = control.save_configuration();
        transport.feed(&format!(
            "250+config-text=\r\n\
             SocksPort 9050\r\n\
             DataDirectory /var/lib/tor\r\n\
             HiddenServiceDir /var/lib/tor/svc\r\n\
             HiddenServicePort 9001 127.0.0.1:9001\r\n\
             ControlPortWriteToFile /run/tor/port\r\n\
             ControlPort 9051\r\n\
             .\r\n\
             250-config-file={}\r\n250 OK\r\n",
            path.display()
        ));
        control.tick();

        assert_eq!(op.clone().wait().await, Ok(()));
        assert!(op.is_success());

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "SocksPort 9050\nControlPort 9051\n");
    }

    #[test]
    fn save_configuration_requires_ownership() {
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        let op = control.save_configuration();
        assert!(op.is_finished());
        assert!(!op.is_success());
        assert!(!transport.written_text().contains("config-text"));
    }

    #[tokio::test]
    async fn get_configuration_delivers_a_multimap() {
        let (mut control, transport) = owned_authenticated_client();

        let rx = control.get_configuration(&["SocksPort"]);
        transport.feed("250 SocksPort=9050\r\n");
        control.tick();

        let values = rx.await.unwrap();
        assert_eq!(values.get("SocksPort").unwrap(), &["9050".to_string()]);
    }
}

// ============================================================================
// Shutdown
// ============================================================================

mod shutdown {
    use super::*;

    #[test]
    fn shutdown_is_ignored_without_ownership() {
        let (mut control, transport) = client(TorControlConfig::new());
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();

        control.shutdown();
        assert!(!transport.written_text().contains("SIGNAL SHUTDOWN"));
    }

    #[test]
    fn shutdown_sync_drains_the_outbound_queue() {
        let (mut control, transport) = client(TorControlConfig::new().own_tor_process(true));
        control.adopt(transport.clone());
        transport.feed(fixtures::protocolinfo_null());
        control.tick();
        transport.feed(fixtures::auth_ok());
        control.tick();

        control.shutdown_sync();

        assert!(transport.written_text().contains("SIGNAL SHUTDOWN\r\n"));
        assert_eq!(control.status(), ControlStatus::NotConnected);
    }
}
