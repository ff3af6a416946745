// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android platform bridge via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`. Each trait method invokes the corresponding
// Android API through JNI calls into the ART runtime.
//
// ## Architecture notes
//
// The host is a regular (non-Native) Activity, so the NDK glue never sets up
// `ndk_context`. The host calls `nativeInit` from `onCreate`, which lands in
// [`install_activity`] and registers the Activity as the process context, and
// `nativeRelease` from `onDestroy`, which drops it again.
//
// Permission checks and requests use the framework methods on `Activity`
// (`checkSelfPermission`, `requestPermissions`, API 23+) rather than the
// AndroidX compat shims, which are not reachable through the system class
// loader from a native thread. The user's answer arrives in the Activity's
// `onRequestPermissionsResult`, which the host forwards back to Rust.

#![cfg(target_os = "android")]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jni::objects::{GlobalRef, JObject, JString, JValue};
use jni::sys::jsize;
use jni::{JNIEnv, JavaVM};

use kreoassist_core::error::{KreoError, Result};
use kreoassist_core::types::{redact_phone, Capability};

use crate::traits::*;

/// `PackageManager.PERMISSION_GRANTED`
pub const PERMISSION_GRANTED: i32 = 0;

/// `Intent.ACTION_CALL`
const ACTION_CALL: &str = "android.intent.action.CALL";

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// VM and Activity registered through [`install_activity`].
#[derive(Clone)]
struct HostContext {
    vm: Arc<JavaVM>,
    activity: GlobalRef,
}

/// `None` until the host calls `nativeInit`, and again after `nativeRelease`.
static HOST_ACTIVITY: Mutex<Option<HostContext>> = Mutex::new(None);

fn host_slot() -> MutexGuard<'static, Option<HostContext>> {
    HOST_ACTIVITY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register `activity` as the Android context used by every bridge call.
///
/// Safe to call again when the Activity is recreated; the previous context is
/// released first.
pub fn install_activity(env: &mut JNIEnv<'_>, activity: &JObject<'_>) -> Result<()> {
    let vm = env
        .get_java_vm()
        .map_err(|e| jni_err(env, "get_java_vm", e))?;
    let global = env
        .new_global_ref(activity)
        .map_err(|e| jni_err(env, "new_global_ref(activity)", e))?;

    let mut slot = host_slot();
    // SAFETY: the VM pointer is valid for the life of the process and the
    // global reference is kept alive in `HOST_ACTIVITY` until it is replaced
    // or released, at which point the context pointing at it is released
    // first.
    unsafe {
        if slot.is_some() {
            ndk_context::release_android_context();
        }
        ndk_context::initialize_android_context(
            vm.get_java_vm_pointer().cast(),
            global.as_obj().as_raw().cast(),
        );
    }
    *slot = Some(HostContext {
        vm: Arc::new(vm),
        activity: global,
    });

    tracing::info!("Android: host activity registered");
    Ok(())
}

/// Drop the registered Activity, typically from `onDestroy`.
///
/// Bridge calls made afterwards fail with `KreoError::Bridge` until the next
/// [`install_activity`]. Does nothing if no Activity is registered.
pub fn release_activity() {
    let mut slot = host_slot();
    if slot.take().is_some() {
        // SAFETY: a context is only ever initialised together with filling
        // the slot, so one exists here.
        unsafe { ndk_context::release_android_context() };
        tracing::info!("Android: host activity released");
    }
}

/// Run `f` with an attached [`JNIEnv`] and the host Activity.
///
/// Fails without touching JNI if no Activity is registered. Attaches the
/// current thread if it is not already attached; the guard detaches it again
/// on return only if this call did the attaching.
fn with_activity<T>(f: impl FnOnce(&mut JNIEnv<'_>, &JObject<'_>) -> Result<T>) -> Result<T> {
    let Some(host) = host_slot().clone() else {
        return Err(KreoError::Bridge("host activity not registered".into()));
    };

    let mut env = host
        .vm
        .attach_current_thread()
        .map_err(|e| KreoError::Bridge(format!("failed to attach JNI thread: {e}")))?;

    f(&mut env, host.activity.as_obj())
}

/// Clear a pending Java exception so the env stays usable for the calls that
/// follow (including building the reply string).
fn clear_pending_exception(env: &mut JNIEnv<'_>) {
    if env.exception_check().unwrap_or(false) {
        let _ = env.exception_describe();
        let _ = env.exception_clear();
    }
}

/// Map any `jni::errors::Error` into `KreoError::Bridge`.
fn jni_err(env: &mut JNIEnv<'_>, context: &str, e: jni::errors::Error) -> KreoError {
    clear_pending_exception(env);
    KreoError::Bridge(format!("{context}: {e}"))
}

/// Map a failure of the OS send/dial step into `KreoError::NativeFailure`.
fn native_err(env: &mut JNIEnv<'_>, action: &'static str, e: jni::errors::Error) -> KreoError {
    clear_pending_exception(env);
    KreoError::NativeFailure {
        action,
        detail: e.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Bridge struct
// ---------------------------------------------------------------------------

/// Android implementation of the KreoAssist platform bridge.
///
/// The struct is zero-sized; all state (permissions included) lives on the
/// Java side.
pub struct AndroidBridge;

impl AndroidBridge {
    /// Create a new Android bridge.
    ///
    /// This does **not** touch JNI — the first JNI call happens lazily when
    /// a trait method is invoked.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformBridge for AndroidBridge {
    fn platform_name(&self) -> &str {
        "Android"
    }
}

// ---------------------------------------------------------------------------
// NativePermissions — Activity.checkSelfPermission / requestPermissions
// ---------------------------------------------------------------------------

impl NativePermissions for AndroidBridge {
    fn is_granted(&self, capability: Capability) -> Result<bool> {
        with_activity(|env, activity| {
            let j_permission: JString = env
                .new_string(capability.android_permission())
                .map_err(|e| jni_err(env, "new_string(permission)", e))?;

            let status = env
                .call_method(
                    activity,
                    "checkSelfPermission",
                    "(Ljava/lang/String;)I",
                    &[JValue::Object(&j_permission)],
                )
                .map_err(|e| jni_err(env, "checkSelfPermission", e))?
                .i()
                .map_err(|e| jni_err(env, "checkSelfPermission->i", e))?;

            tracing::debug!(%capability, status, "Android: permission checked");
            Ok(status == PERMISSION_GRANTED)
        })
    }

    /// Dispatch the system permission prompt.
    ///
    /// `requestPermissions` returns immediately; the result is delivered to
    /// `onRequestPermissionsResult` with the same `request_code`.
    fn request_permissions(&self, capabilities: &[Capability], request_code: i32) -> Result<()> {
        with_activity(|env, activity| {
            let string_class = env
                .find_class("java/lang/String")
                .map_err(|e| jni_err(env, "find_class(String)", e))?;

            let permissions = env
                .new_object_array(capabilities.len() as jsize, &string_class, JObject::null())
                .map_err(|e| jni_err(env, "new_object_array(permissions)", e))?;

            for (i, cap) in capabilities.iter().enumerate() {
                let j_permission: JString = env
                    .new_string(cap.android_permission())
                    .map_err(|e| jni_err(env, "new_string(permission[i])", e))?;
                env.set_object_array_element(&permissions, i as jsize, j_permission)
                    .map_err(|e| jni_err(env, "set_object_array_element", e))?;
            }

            env.call_method(
                activity,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[JValue::Object(&permissions), JValue::Int(request_code)],
            )
            .map_err(|e| jni_err(env, "requestPermissions", e))?;

            tracing::info!(
                ?capabilities,
                request_code,
                "Android: permission prompt dispatched — awaiting onRequestPermissionsResult"
            );
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// NativeSms — android.telephony.SmsManager
// ---------------------------------------------------------------------------

impl NativeSms for AndroidBridge {
    /// Send through `SmsManager.getDefault()`.
    ///
    /// `divideMessage` splits the body at the carrier segment limit and
    /// `sendMultipartTextMessage` sends all parts; a short body comes back as
    /// a single part. Sent/delivery intents are not requested.
    fn send_text(&self, phone: &str, message: &str) -> Result<()> {
        with_activity(|env, _activity| {
            let parts = send_multipart(env, phone, message)
                .map_err(|e| native_err(env, "sms", e))?;

            tracing::info!(
                phone = %redact_phone(phone),
                chars = message.chars().count(),
                parts,
                "Android: SMS handed to SmsManager"
            );
            Ok(())
        })
    }
}

fn send_multipart(env: &mut JNIEnv<'_>, phone: &str, message: &str) -> jni::errors::Result<i32> {
    let sms_manager = env
        .call_static_method(
            "android/telephony/SmsManager",
            "getDefault",
            "()Landroid/telephony/SmsManager;",
            &[],
        )?
        .l()?;

    let j_message = env.new_string(message)?;
    let parts = env
        .call_method(
            &sms_manager,
            "divideMessage",
            "(Ljava/lang/String;)Ljava/util/ArrayList;",
            &[JValue::Object(&j_message)],
        )?
        .l()?;
    let part_count = env.call_method(&parts, "size", "()I", &[])?.i()?;

    let j_phone = env.new_string(phone)?;
    let null = JObject::null();
    env.call_method(
        &sms_manager,
        "sendMultipartTextMessage",
        "(Ljava/lang/String;Ljava/lang/String;Ljava/util/ArrayList;Ljava/util/ArrayList;Ljava/util/ArrayList;)V",
        &[
            JValue::Object(&j_phone),
            JValue::Object(&null), // scAddress: default SMSC
            JValue::Object(&parts),
            JValue::Object(&null), // sentIntents
            JValue::Object(&null), // deliveryIntents
        ],
    )?;

    Ok(part_count)
}

// ---------------------------------------------------------------------------
// NativeDialer — Intent ACTION_CALL
// ---------------------------------------------------------------------------

impl NativeDialer for AndroidBridge {
    /// Start `Intent.ACTION_CALL` with a `tel:` URI.
    ///
    /// Unlike `ACTION_DIAL` this places the call straight away, which is why
    /// it needs `CALL_PHONE`. Call state is not observed.
    fn place_call(&self, phone: &str) -> Result<()> {
        with_activity(|env, activity| {
            start_call_intent(env, activity, phone).map_err(|e| native_err(env, "call", e))?;

            tracing::info!(phone = %redact_phone(phone), "Android: call intent dispatched");
            Ok(())
        })
    }
}

fn start_call_intent(
    env: &mut JNIEnv<'_>,
    activity: &JObject<'_>,
    phone: &str,
) -> jni::errors::Result<()> {
    let j_uri = env.new_string(format!("tel:{phone}"))?;
    let uri = env
        .call_static_method(
            "android/net/Uri",
            "parse",
            "(Ljava/lang/String;)Landroid/net/Uri;",
            &[JValue::Object(&j_uri)],
        )?
        .l()?;

    let j_action = env.new_string(ACTION_CALL)?;
    let intent = env.new_object(
        "android/content/Intent",
        "(Ljava/lang/String;Landroid/net/Uri;)V",
        &[JValue::Object(&j_action), JValue::Object(&uri)],
    )?;

    env.call_method(
        activity,
        "startActivity",
        "(Landroid/content/Intent;)V",
        &[JValue::Object(&intent)],
    )?;
    Ok(())
}
