use super::*;

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.1.100".to_string(),
            port: default_modbus_port(),
            unit_id: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
        }
    }
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            brand: InverterBrand::Sma,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            injection_tariff_entity: String::new(),
            import_power_entity: String::new(),
            export_power_entity: String::new(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 10,
            cutoff_tariff: 50.0,
            import_threshold_watts: 5.0,
            start_enabled: false,
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            short_delay_seconds: 60,
            long_delay_seconds: 600,
            short_attempts: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/sunspec-curtail.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 8089,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            inverter: InverterConfig::default(),
            telemetry: TelemetryConfig::default(),
            control: ControlConfig::default(),
            reconnect: ReconnectConfig::default(),
            logging: LoggingConfig::default(),
            web: WebConfig::default(),
        }
    }
}
