// src/db/memory.rs

// Peças compartilhadas pelos repositórios em memória (dev/testes, sem DATABASE_URL).
// Nada aqui é durável: o estado some quando o processo termina.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::common::pagination::SortOrder;

pub type Table<T> = Arc<RwLock<HashMap<Uuid, T>>>;

pub fn table<T>() -> Table<T> {
    Arc::new(RwLock::new(HashMap::new()))
}

pub fn sort_rows<T>(
    rows: &mut [T],
    order: SortOrder,
    primary: impl Fn(&T, &T) -> Ordering,
    tie_break: impl Fn(&T, &T) -> Ordering,
) {
    rows.sort_by(|a, b| {
        let ord = match order {
            SortOrder::Asc => primary(a, b),
            SortOrder::Desc => primary(b, a),
        };
        ord.then_with(|| tie_break(a, b))
    });
}

/// Busca parcial sem diferenciar maiúsculas; `needle` já deve vir em minúsculas.
pub fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

/// Comparação de textos para ordenação estável (ignora caixa).
pub fn cmp_ci(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorts_both_directions() {
        let mut v = vec![3, 1, 2];
        sort_rows(&mut v, SortOrder::Asc, |a, b| a.cmp(b), |_, _| Ordering::Equal);
        assert_eq!(v, vec![1, 2, 3]);
        sort_rows(&mut v, SortOrder::Desc, |a, b| a.cmp(b), |_, _| Ordering::Equal);
        assert_eq!(v, vec![3, 2, 1]);
    }

    #[test]
    fn tie_break_stays_ascending_when_descending() {
        // (chave, desempate)
        let mut v = vec![(1, 'b'), (2, 'b'), (2, 'a'), (1, 'a')];
        sort_rows(&mut v, SortOrder::Desc, |a, b| a.0.cmp(&b.0), |a, b| a.1.cmp(&b.1));
        assert_eq!(v, vec![(2, 'a'), (2, 'b'), (1, 'a'), (1, 'b')]);
    }

    #[test]
    fn contains_ignores_case() {
        assert!(contains_ci(Some("Padaria Central"), "central"));
        assert!(!contains_ci(None, "x"));
    }
}
