use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Value};

use crate::AuditImage;

/// Fields the model must report, in this order.
pub const CANONICAL_FIELDS: [&str; 8] = [
    "segmentación",
    "inversión/presupuesto",
    "fechas",
    "objetivo de campaña",
    "audiencias",
    "geografía",
    "ubicaciones",
    "creatividad/formato",
];

pub const SYSTEM_PROMPT: &str = "Eres auditor de pauta digital para una central de medios. Compara pedido vs configuración real sin inventar. Debes escribir hallazgos claros para equipo operativo y responder solo JSON.";

const SOURCE_IMAGE_LABEL: &str = "Imagen 1: Solicitud en Happy Fox";
const PLATFORM_IMAGE_LABEL: &str = "Imagen 2: Configuración en plataforma";

pub fn build_instruction_prompt(platform_name: &str) -> String {
    let numbered_fields = CANONICAL_FIELDS
        .iter()
        .enumerate()
        .map(|(idx, field)| format!("  {}) {field}", idx + 1))
        .collect::<Vec<String>>()
        .join("\n");
    format!(
        "Compara la imagen de Happy Fox con la imagen de plataforma ({platform_name}).\n\
Evalúa al menos: {summary_list}.\n\
\n\
Reglas:\n\
- Happy Fox es la fuente de verdad (base de validación).\n\
- La imagen de plataforma ({platform_name}) se valida contra Happy Fox.\n\
- Escribe en español claro para planners/traffickers.\n\
- Responde SOLO JSON valido, sin markdown, sin bloque ```.\n\
- Debes devolver EXACTAMENTE estos 8 campos en \"campos\" y en este orden:\n\
{numbered_fields}\n\
- No agregues campos extra.\n\
- Cada valor de \"happyfox\", \"plataforma\", \"diferencia\" y \"accion\" debe ser breve (máximo 20 palabras).\n\
- \"alertas\" máximo 3 elementos, cada uno máximo 16 palabras.\n\
- Devuelve SOLO JSON con esta estructura exacta:\n\
{{\n  \"resumen\": string,\n  \"aprobado\": boolean,\n  \"campos\": [\n    {{\n      \"campo\": string,\n      \"estado\": \"correcto\" | \"diferencia\" | \"no_visible\",\n      \"happyfox\": string,\n      \"plataforma\": string,\n      \"diferencia\": string,\n      \"accion\": string\n    }}\n  ],\n  \"alertas\": string[]\n}}",
        summary_list = CANONICAL_FIELDS.join(", "),
    )
}

/// Messages API body: one user turn with the instructions followed by both
/// labelled screenshots as inline base64 attachments.
pub fn build_messages_body(
    model: &str,
    max_tokens: u64,
    platform_name: &str,
    source_of_truth: &AuditImage,
    platform: &AuditImage,
) -> Value {
    json!({
        "model": model,
        "max_tokens": max_tokens,
        "temperature": 0,
        "system": SYSTEM_PROMPT,
        "messages": [{
            "role": "user",
            "content": [
                {"type": "text", "text": build_instruction_prompt(platform_name)},
                {"type": "text", "text": SOURCE_IMAGE_LABEL},
                image_block(source_of_truth),
                {"type": "text", "text": PLATFORM_IMAGE_LABEL},
                image_block(platform),
            ],
        }],
    })
}

fn image_block(image: &AuditImage) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.mime_type,
            "data": BASE64.encode(&image.bytes),
        }
    })
}
