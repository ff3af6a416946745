// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI entry points for the host Activity.
//
// Kotlin side (`com.example.kreoassist.NativeChannel`):
//
//   external fun nativeInit(activity: Activity, configJson: String?): String
//   external fun nativeRelease()
//   external fun nativeHandle(requestJson: String): String
//   external fun nativeOnPermissionResult(
//       requestCode: Int, permissions: Array<String>, grantResults: IntArray,
//   ): String
//
// `nativeInit` returns the channel name the host should bind its method
// channel to. `nativeRelease` belongs in `onDestroy` so the destroyed
// Activity is not kept alive by the bridge.
//
// `nativeHandle` is called from the method-channel handler with the encoded
// call and the returned envelope is passed to `result.success/error/
// notImplemented`. `nativeOnPermissionResult` is called from
// `onRequestPermissionsResult`; the JSON array it returns is what the host
// forwards to the shell's event channel.

use std::sync::OnceLock;

use jni::objects::{JClass, JIntArray, JObject, JObjectArray, JString};
use jni::sys::{jint, jstring};
use jni::JNIEnv;

use kreoassist_bridge::android::{install_activity, release_activity, PERMISSION_GRANTED};
use kreoassist_bridge::platform_bridge;
use kreoassist_core::config::BridgeConfig;
use kreoassist_core::error::KreoError;
use kreoassist_core::types::{Capability, MethodReply};

use crate::codec::encode_reply;
use crate::dispatch::CapabilityBridge;

static BRIDGE: OnceLock<CapabilityBridge> = OnceLock::new();

fn bridge() -> &'static CapabilityBridge {
    BRIDGE.get_or_init(|| CapabilityBridge::new(platform_bridge(), BridgeConfig::default()))
}

/// Clear any Java exception left pending by a failed JNI call.
fn clear_pending_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// Hand a reply back to Java. A pending exception would make `new_string`
/// fail, so it is cleared first.
fn to_jstring(env: &mut JNIEnv<'_>, value: String) -> jstring {
    clear_pending_exception(env);
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            tracing::error!(error = %e, "failed to allocate reply string");
            std::ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_kreoassist_NativeChannel_nativeInit<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    activity: JObject<'local>,
    config_json: JString<'local>,
) -> jstring {
    if let Err(e) = install_activity(&mut env, &activity) {
        tracing::error!(error = %e, "host activity registration failed");
    }

    let config = if config_json.is_null() {
        BridgeConfig::default()
    } else {
        match env.get_string(&config_json) {
            Ok(json) => {
                let json: String = json.into();
                BridgeConfig::from_json(&json).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "invalid bridge config, using defaults");
                    BridgeConfig::default()
                })
            }
            Err(e) => {
                clear_pending_exception(&mut env);
                tracing::warn!(error = %e, "unreadable bridge config, using defaults");
                BridgeConfig::default()
            }
        }
    };

    if let Err(rejected) = BRIDGE.set(CapabilityBridge::new(platform_bridge(), config)) {
        if rejected.config() != bridge().config() {
            tracing::warn!(
                "capability bridge already initialised with a different config; \
                 the config passed to nativeInit is ignored"
            );
        }
    }

    let channel = bridge().config().channel_name.clone();
    to_jstring(&mut env, channel)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_kreoassist_NativeChannel_nativeRelease<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    release_activity();
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_kreoassist_NativeChannel_nativeHandle<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request: JString<'local>,
) -> jstring {
    let reply = match env.get_string(&request) {
        Ok(json) => {
            let json: String = json.into();
            bridge().handle_json(&json)
        }
        Err(e) => {
            clear_pending_exception(&mut env);
            let err = KreoError::InvalidRequest(format!("unreadable request string: {e}"));
            encode_reply(&MethodReply::error(&err, None)).unwrap_or_default()
        }
    };
    to_jstring(&mut env, reply)
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_kreoassist_NativeChannel_nativeOnPermissionResult<
    'local,
>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    request_code: jint,
    permissions: JObjectArray<'local>,
    grant_results: JIntArray<'local>,
) -> jstring {
    let results = match read_grants(&mut env, &permissions, &grant_results) {
        Ok(results) => results,
        Err(e) => {
            clear_pending_exception(&mut env);
            tracing::warn!(request_code, error = %e, "could not read permission result arrays");
            Vec::new()
        }
    };

    let outcomes = bridge().on_permission_result(request_code, &results);
    let json = serde_json::to_string(&outcomes).unwrap_or_else(|_| "[]".to_owned());
    to_jstring(&mut env, json)
}

/// Pair each reported permission with its grant flag, skipping permissions
/// this bridge does not manage.
fn read_grants(
    env: &mut JNIEnv<'_>,
    permissions: &JObjectArray<'_>,
    grant_results: &JIntArray<'_>,
) -> jni::errors::Result<Vec<(Capability, bool)>> {
    let count = env.get_array_length(permissions)?;
    let grant_count = env.get_array_length(grant_results)?;

    let mut grants = vec![0; grant_count.max(0) as usize];
    env.get_int_array_region(grant_results, 0, &mut grants)?;

    let mut results = Vec::new();
    for i in 0..count.min(grant_count) {
        let element = env.get_object_array_element(permissions, i)?;
        let name: String = env.get_string(&JString::from(element))?.into();
        if let Some(capability) = Capability::from_android_permission(&name) {
            results.push((capability, grants[i as usize] == PERMISSION_GRANTED));
        }
    }
    Ok(results)
}
