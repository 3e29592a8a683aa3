//! Language profiles: named presets pairing a whisper language code with a
//! priming prompt that biases the engine toward lecture speech.

/// A named language preset.
#[derive(Debug, Clone, Copy)]
pub struct LanguageProfile {
    pub name: &'static str,
    /// Whisper language code passed to the engine
    pub code: &'static str,
    /// Domain prompt appended to the caller's context
    pub prompt: &'static str,
    /// Sampling temperature passed to the engine
    pub temperature: f32,
}

const PROFILES: &[LanguageProfile] = &[
    LanguageProfile {
        name: "es-chile",
        code: "es",
        prompt: "Transcripción de clase universitaria en Chile. \
                 Transcribir únicamente la voz del profesor. \
                 Ignorar conversaciones de alumnos en el fondo. \
                 Contexto académico formal.",
        temperature: 0.0,
    },
    LanguageProfile {
        name: "es-spain",
        code: "es",
        prompt: "Transcripción de clase universitaria en España. \
                 Voz del profesor, contexto académico y formal.",
        temperature: 0.0,
    },
    LanguageProfile {
        name: "es-neutro",
        code: "es",
        prompt: "Transcripción de clase universitaria en español. \
                 Voz del profesor, contexto académico.",
        temperature: 0.0,
    },
    LanguageProfile {
        name: "en",
        code: "en",
        prompt: "University lecture transcription. Professor's voice, academic context.",
        temperature: 0.0,
    },
    LanguageProfile {
        name: "accento-mixto",
        code: "es",
        prompt: "Transcripción de clase universitaria de Microeconomía en Chile. \
                 El profesor es nativo polaco, aprendió español en España y lleva años en Chile: \
                 pronuncia vocales de forma más cerrada, usa 'vosotros' ocasionalmente, \
                 mezcla expresiones de España y Chile. \
                 Transcribir únicamente la voz del profesor, ignorar respuestas breves de alumnos. \
                 Términos frecuentes: modelizar, función de utilidad, maximización de utilidad, \
                 utilidad marginal, costo de oportunidad, elasticidad precio, curva de demanda, \
                 cesta de bienes, preferencias, racionalidad acotada, economía conductual, \
                 excedente del consumidor, restricción presupuestaria, óptimo del consumidor, \
                 multiplicador de Lagrange, bienes Giffen, efecto sustitución, efecto ingreso, \
                 sesgos cognitivos, heurísticas, nudge, arquitectura de decisiones.",
        // Decodes the mixed accent better with a little sampling noise
        temperature: 0.2,
    },
];

/// Fallback context used when the caller supplies none.
const DEFAULT_CONTEXT: &str = "Transcripción de clase universitaria en Chile. \
                               Transcribir únicamente al expositor principal, \
                               ignorar ruido de fondo y conversaciones secundarias.";

pub fn find(name: &str) -> Option<&'static LanguageProfile> {
    PROFILES.iter().find(|p| p.name == name)
}

/// Whisper language code for a profile name, defaulting to Spanish for
/// unknown profiles.
pub fn language_code(name: &str) -> &'static str {
    find(name).map(|p| p.code).unwrap_or("es")
}

/// Sampling temperature for a profile name, greedy for unknown profiles.
pub fn sampling_temperature(name: &str) -> f32 {
    find(name).map(|p| p.temperature).unwrap_or(0.0)
}

/// Assemble the initial prompt from the caller's context and the profile
/// prompt. The caller's context replaces the default fallback; the profile
/// prompt is appended unless the context already contains it.
pub fn build_initial_prompt(profile_name: &str, context: &str) -> String {
    let user_ctx = context.trim();
    let base = if user_ctx.is_empty() {
        DEFAULT_CONTEXT
    } else {
        user_ctx
    };

    let profile_prompt = find(profile_name).map(|p| p.prompt.trim()).unwrap_or("");
    if profile_prompt.is_empty() {
        return base.to_string();
    }
    if base.to_lowercase().contains(&profile_prompt.to_lowercase()) {
        return base.to_string();
    }
    format!("{base}\n{profile_prompt}")
}
