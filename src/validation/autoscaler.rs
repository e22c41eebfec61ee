//! VerticaAutoscaler rules

use super::{FieldError, FieldErrorList, FieldPath};
use crate::crd::v1::autoscaler::{
    CUSTOM_AUTOSCALER_HPA, CUSTOM_AUTOSCALER_SCALED_OBJECT, METRIC_TYPE_AVERAGE_VALUE,
    METRIC_TYPE_UTILIZATION, METRIC_TYPE_VALUE, SCALING_GRANULARITY_POD,
    SCALING_GRANULARITY_SUBCLUSTER, TRIGGER_TYPE_CPU, TRIGGER_TYPE_MEMORY, TRIGGER_TYPE_PROMETHEUS,
};
use crate::crd::v1::{CustomAutoscalerSpec, ScaledObjectSpec, VerticaAutoscalerSpec};

pub fn validate_autoscaler(spec: &VerticaAutoscalerSpec) -> FieldErrorList {
    let mut errors = FieldErrorList::new();
    check_scaling_granularity(spec, &mut errors);
    check_template(spec, &mut errors);
    if let Some(custom) = spec.custom_autoscaler.as_ref() {
        check_custom_autoscaler(custom, &mut errors);
        if spec.is_scaled_object_type() {
            if let Some(so) = custom.scaled_object.as_ref() {
                check_scaled_object(so, &mut errors);
            }
        }
    }
    check_hpa(spec, &mut errors);
    errors
}

fn check_scaling_granularity(spec: &VerticaAutoscalerSpec, errors: &mut FieldErrorList) {
    let path = FieldPath::spec().child("scalingGranularity");
    match spec.scaling_granularity.as_str() {
        SCALING_GRANULARITY_POD => {
            if spec.service_name.is_empty() {
                errors.push(FieldError::invalid(
                    path,
                    &spec.scaling_granularity,
                    format!(
                        "Scaling granularity must be '{SCALING_GRANULARITY_SUBCLUSTER}' if service name is empty."
                    ),
                ));
            }
        }
        SCALING_GRANULARITY_SUBCLUSTER => {}
        other => errors.push(FieldError::not_supported(
            path,
            other,
            format!(
                "scalingGranularity must be set to either {SCALING_GRANULARITY_SUBCLUSTER} or {SCALING_GRANULARITY_POD}"
            ),
        )),
    }
}

fn check_template(spec: &VerticaAutoscalerSpec, errors: &mut FieldErrorList) {
    if !spec.can_use_template() {
        return;
    }
    let path = FieldPath::spec().child("template").child("serviceName");
    let template_service = &spec.template.service_name;
    if !spec.service_name.is_empty() && *template_service != spec.service_name {
        errors.push(FieldError::invalid(
            path.clone(),
            template_service,
            "The serviceName in the subcluster template must match spec.serviceName",
        ));
    }
    if spec.scaling_granularity == SCALING_GRANULARITY_POD {
        errors.push(FieldError::forbidden(
            path,
            template_service,
            "You cannot use the template if scalingGranularity is Pod. Set the template size to 0 to disable the template",
        ));
    }
}

fn check_custom_autoscaler(custom: &CustomAutoscalerSpec, errors: &mut FieldErrorList) {
    let prefix = FieldPath::spec().child("customAutoscaler");
    let known = [CUSTOM_AUTOSCALER_HPA, CUSTOM_AUTOSCALER_SCALED_OBJECT, ""];
    if !known.contains(&custom.type_.as_str()) {
        errors.push(FieldError::not_supported(
            prefix.child("type"),
            &custom.type_,
            format!("Type must be one of '{CUSTOM_AUTOSCALER_HPA}', '{CUSTOM_AUTOSCALER_SCALED_OBJECT}' or empty."),
        ));
    }
    if custom.hpa.is_some() && custom.scaled_object.is_some() {
        errors.push(FieldError::forbidden(
            prefix.clone(),
            &custom.type_,
            "hpa and scaledObject cannot both be set",
        ));
    }

    if let Some(hpa) = custom.hpa.as_ref() {
        if let Some(min) = hpa.min_replicas.filter(|min| *min > hpa.max_replicas) {
            errors.push(FieldError::invalid(
                prefix.child("hpa").child("minReplicas"),
                min,
                format!("minReplicas cannot be greater than maxReplicas ({})", hpa.max_replicas),
            ));
        }
    }
    if let Some(so) = custom.scaled_object.as_ref() {
        if let (Some(min), Some(max)) = (so.min_replicas, so.max_replicas) {
            if min > max {
                errors.push(FieldError::invalid(
                    prefix.child("scaledObject").child("minReplicas"),
                    min,
                    format!("minReplicas cannot be greater than maxReplicas ({max})"),
                ));
            }
        }
    }
}

fn check_scaled_object(so: &ScaledObjectSpec, errors: &mut FieldErrorList) {
    let triggers = [TRIGGER_TYPE_CPU, TRIGGER_TYPE_MEMORY, TRIGGER_TYPE_PROMETHEUS, ""];
    let prometheus_targets = [METRIC_TYPE_VALUE, METRIC_TYPE_AVERAGE_VALUE];
    let resource_targets = [METRIC_TYPE_UTILIZATION, METRIC_TYPE_AVERAGE_VALUE];

    for (i, trigger) in so.metrics.iter().enumerate() {
        let prefix = FieldPath::spec()
            .child("customAutoscaler")
            .child("scaledObject")
            .child("metrics")
            .index(i);
        let kind = trigger.type_.as_str();
        let target = trigger.metric_type.as_str();

        if !triggers.contains(&kind) {
            errors.push(FieldError::not_supported(
                prefix.child("type"),
                kind,
                format!(
                    "Type must be one of '{TRIGGER_TYPE_CPU}', '{TRIGGER_TYPE_MEMORY}', '{TRIGGER_TYPE_PROMETHEUS}' or empty."
                ),
            ));
        }
        if kind == TRIGGER_TYPE_PROMETHEUS && !prometheus_targets.contains(&target) {
            errors.push(FieldError::not_supported(
                prefix.child("metricType"),
                target,
                format!(
                    "When Type is set to {TRIGGER_TYPE_PROMETHEUS} metricType must be one of '{METRIC_TYPE_VALUE}', '{METRIC_TYPE_AVERAGE_VALUE}'."
                ),
            ));
        }
        if (kind == TRIGGER_TYPE_CPU || kind == TRIGGER_TYPE_MEMORY) && !resource_targets.contains(&target) {
            errors.push(FieldError::not_supported(
                prefix.child("metricType"),
                target,
                format!(
                    "When Type is set to {TRIGGER_TYPE_CPU} or {TRIGGER_TYPE_MEMORY} metricType must be one of '{METRIC_TYPE_UTILIZATION}', '{METRIC_TYPE_AVERAGE_VALUE}'."
                ),
            ));
        }
    }
}

/// Scale-in thresholds are evaluated by the operator itself, so the HPA must
/// not hold back scale-down on its own
fn check_hpa(spec: &VerticaAutoscalerSpec, errors: &mut FieldErrorList) {
    if !spec.has_scale_in_threshold() {
        return;
    }
    let Some(hpa) = spec.custom_autoscaler.as_ref().and_then(|c| c.hpa.as_ref()) else {
        return;
    };
    if let Some(window) = hpa.scale_down_window().filter(|w| *w != 0) {
        errors.push(FieldError::invalid(
            FieldPath::spec().child("customAutoscaler").child("hpa"),
            window,
            "When scaledownThreshold is set, scaledown stabilization window must be 0",
        ));
    }
}
