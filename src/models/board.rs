//! Board model: a named feed around one PubMed query.

use serde::{Deserialize, Serialize};

/// A user-configurable feed wrapping one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Stable identifier ("vaccine", "custom-1717171717171")
    pub id: String,

    /// Display label
    pub label: String,

    /// PubMed query expression
    pub query: String,

    /// Optional icon identifier overriding the id-based default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_id: Option<String>,
}

impl Board {
    pub fn new(id: impl Into<String>, label: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            query: query.into(),
            icon_id: None,
        }
    }

    /// Set the icon identifier
    pub fn with_icon(mut self, icon_id: impl Into<String>) -> Self {
        self.icon_id = Some(icon_id.into());
        self
    }

    /// Icon to display: the explicit icon id, else the board id
    pub fn icon(&self) -> &str {
        self.icon_id.as_deref().unwrap_or(&self.id)
    }
}

/// The curated boards every new user starts with
pub fn default_boards() -> Vec<Board> {
    vec![
        Board::new(
            "vaccine",
            "Vaccine Journals",
            r#"("Vaccine"[jo] OR "Hum Vaccin Immunother"[jo] OR "NPJ Vaccines"[jo] OR "Vaccine X"[jo] OR "Vaccines (Basel)"[jo] OR "Expert Rev Vaccines"[jo])"#,
        ),
        Board::new(
            "pediatric",
            "Pediatric ID",
            r#"Pediatr Infect Dis J[Jo] OR "J Pediatric Infect Dis Soc"[Jo]"#,
        ),
        Board::new(
            "general",
            "General ID",
            r#"("Lancet Infect Dis"[jo] or "Clin Infect Dis"[jo] or "Emerg Infect Dis"[jo] or "J Infect"[jo] or "Nat Rev Microbiol"[jo] or "Nat Rev Immunol"[jo] or "J Antimicrob Chemother"[jo] or "Int J Antimicrob Agents"[jo] or "Travel Med Infect Dis"[jo] or "Open Forum Infect Dis"[jo] or "J Clin Microbiol"[jo] or "Clin Microbiol Rev"[jo] or "Med Mycol"[jo] or "Mycoses"[jo] or "Vector Borne Zoonotic Dis"[jo] or "Antimicrob Agents Chemother"[jo] or "Microbiome"[jo] or "Ther Adv Infect Dis"[jo] or "BMC Infect Dis"[jo] or "J Hosp Infect"[jo] or "Infect Dis Clin North Am"[jo] or "PLoS Pathog"[jo] or "Virulence"[jo] or "mBio"[jo] or "J Virol"[jo] or "Euro Surveill"[jo] or "Lancet HIV"[jo] or "J Travel Med"[jo] or "Infect Immun"[jo] or "Pathog Dis"[jo])"#,
        ),
        Board::new(
            "travel",
            "Travel Medicine",
            r#""J Travel Med"[jo] OR "Travel Med Infect Dis"[jo] OR "Am J Trop Med Hyg"[jo] OR "Trans R Soc Trop Med Hyg"[jo] OR "Int J Travel Med Glob Health"[jo]"#,
        ),
    ]
}

/// Ordered list of boards with the edits the dashboard supports
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardList {
    boards: Vec<Board>,
}

impl BoardList {
    pub fn new(boards: Vec<Board>) -> Self {
        Self { boards }
    }

    pub fn as_slice(&self) -> &[Board] {
        &self.boards
    }

    pub fn into_vec(self) -> Vec<Board> {
        self.boards
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.iter()
    }

    /// Find a board by id
    pub fn get(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    /// Display position of a board
    pub fn position(&self, id: &str) -> Option<usize> {
        self.boards.iter().position(|b| b.id == id)
    }

    /// Append a custom board, assigning it a `custom-<millis>` id
    pub fn add_custom(
        &mut self,
        label: impl Into<String>,
        query: impl Into<String>,
        icon_id: Option<String>,
    ) -> &Board {
        let mut millis = chrono::Utc::now().timestamp_millis();
        while self.get(&format!("custom-{}", millis)).is_some() {
            millis += 1;
        }

        let mut board = Board::new(format!("custom-{}", millis), label, query);
        board.icon_id = icon_id;
        self.boards.push(board);
        &self.boards[self.boards.len() - 1]
    }

    /// Append a board as-is
    pub fn push(&mut self, board: Board) {
        self.boards.push(board);
    }

    /// Replace label and query of an existing board. Returns false if absent.
    pub fn edit(&mut self, id: &str, label: impl Into<String>, query: impl Into<String>) -> bool {
        match self.boards.iter_mut().find(|b| b.id == id) {
            Some(board) => {
                board.label = label.into();
                board.query = query.into();
                true
            }
            None => false,
        }
    }

    /// Remove a board, returning it
    pub fn remove(&mut self, id: &str) -> Option<Board> {
        let index = self.position(id)?;
        Some(self.boards.remove(index))
    }

    /// Move the board at `from` to index `to`, shifting the ones in between
    pub fn move_board(&mut self, from: usize, to: usize) -> bool {
        if from >= self.boards.len() || to >= self.boards.len() {
            return false;
        }
        if from != to {
            let board = self.boards.remove(from);
            self.boards.insert(to, board);
        }
        true
    }

    /// Move a board next to another one, as drag-and-drop does
    pub fn move_onto(&mut self, active_id: &str, over_id: &str) -> bool {
        if active_id == over_id {
            return false;
        }
        match (self.position(active_id), self.position(over_id)) {
            (Some(from), Some(to)) => self.move_board(from, to),
            _ => false,
        }
    }
}

impl From<Vec<Board>> for BoardList {
    fn from(boards: Vec<Board>) -> Self {
        Self::new(boards)
    }
}
